// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Contracts of the Render Hardware Interface.

pub mod api;
pub mod bindless;
pub mod error;
pub mod sync;
pub mod traits;

pub use self::bindless::{FreeListAllocator, ResourceIndex, SamplerIndex, INVALID_INDEX};
pub use self::error::{PipelineError, RhiError, RhiResult, ShaderError};
pub use self::sync::{FenceSignal, FenceState, FenceStateMachine, SemaphoreCounter};
pub use self::traits::{BarrierResource, QueueSubmission, RhiBackend, SemaphoreOp};
