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

//! Host execution substrate shared by the native backends.
//!
//! Each backend records into its own native command representation and lowers
//! it to [`HostOp`]s at submission. Queues run those on worker threads against
//! host memory, so both backends behave like a device without needing a driver.

pub mod device;
pub mod execute;
pub mod memory;
pub mod queue;
pub mod sync;

pub use device::{host_adapters, DescriptorTable, HostDevice};
pub use execute::{ExecutionStats, HostOp};
pub use memory::{Allocation, AllocationRef, AllocationShape, HostHeap};
pub use queue::{HostJob, HostQueue};
pub use sync::{HostEvent, HostTimeline, SyncSignal, SyncWait};
