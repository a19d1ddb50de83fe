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

//! A queue executing jobs on its own worker thread.
//!
//! Jobs are executed in submission order. A job first blocks on its waits,
//! executes its operations, then fires its signals and bumps the queue's
//! progress timeline, which `wait_idle` blocks on.

use super::execute::{execute, ExecutionStats, HostOp};
use super::sync::{HostTimeline, SyncSignal, SyncWait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tessera_core::logging::{LogChannel, LogLayer};
use tessera_core::rhi::api::QueueType;
use tessera_core::rhi::error::{RhiError, RhiResult};
use tessera_core::rhi_log;

/// One submission.
#[derive(Debug, Default)]
pub struct HostJob {
    /// Waits performed before execution.
    pub waits: Vec<SyncWait>,
    /// Operations, in order.
    pub ops: Vec<HostOp>,
    /// Signals fired after execution.
    pub signals: Vec<SyncSignal>,
}

enum Message {
    Job(HostJob, u64),
    Shutdown,
}

/// A queue backed by a worker thread.
pub struct HostQueue {
    queue_type: QueueType,
    sender: flume::Sender<Message>,
    submitted: AtomicU64,
    progress: Arc<HostTimeline>,
    stats: Arc<Mutex<ExecutionStats>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HostQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostQueue")
            .field("queue_type", &self.queue_type)
            .field("submitted", &self.submitted.load(Ordering::Relaxed))
            .field("completed", &self.progress.value())
            .finish()
    }
}

impl HostQueue {
    /// Spawns the worker of a new queue.
    pub fn spawn(queue_type: QueueType, name: &str) -> RhiResult<Arc<Self>> {
        let (sender, receiver) = flume::unbounded::<Message>();
        let progress = HostTimeline::new(0);
        let stats = Arc::new(Mutex::new(ExecutionStats::default()));

        let worker = {
            let progress = progress.clone();
            let stats = stats.clone();
            std::thread::Builder::new()
                .name(format!("tessera-{name}-{queue_type}"))
                .spawn(move || {
                    while let Ok(Message::Job(job, serial)) = receiver.recv() {
                        for wait in &job.waits {
                            wait.block();
                        }
                        {
                            let mut stats = stats.lock().unwrap_or_else(|p| p.into_inner());
                            for op in &job.ops {
                                execute(op, &mut stats);
                            }
                        }
                        for signal in &job.signals {
                            signal.fire();
                        }
                        progress.signal(serial);
                    }
                })
                .map_err(|_| RhiError::Backend {
                    call: "CreateQueueWorker",
                    code: -1,
                })?
        };

        Ok(Arc::new(Self {
            queue_type,
            sender,
            submitted: AtomicU64::new(0),
            progress,
            stats,
            worker: Mutex::new(Some(worker)),
        }))
    }

    /// The queue's type.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Enqueues a job. Returns immediately.
    pub fn submit(&self, job: HostJob) -> RhiResult<()> {
        let serial = self.submitted.fetch_add(1, Ordering::AcqRel) + 1;
        self.sender
            .send(Message::Job(job, serial))
            .map_err(|_| RhiError::Backend {
                call: "QueueSubmit",
                code: -4,
            })
    }

    /// Blocks until every submitted job has completed.
    pub fn wait_idle(&self) {
        let target = self.submitted.load(Ordering::Acquire);
        self.progress.wait_for(target);
    }

    /// Returns `true` if no job is pending.
    pub fn is_idle(&self) -> bool {
        self.progress.value() >= self.submitted.load(Ordering::Acquire)
    }

    /// A snapshot of the executed work.
    pub fn stats(&self) -> ExecutionStats {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for HostQueue {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        let worker = self.worker.get_mut().ok().and_then(Option::take);
        if let Some(worker) = worker {
            if worker.join().is_err() {
                rhi_log!(
                    LogLayer::Backend,
                    LogChannel::Warning,
                    "{} queue worker panicked",
                    self.queue_type
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::memory::{Allocation, AllocationShape, HostHeap};
    use super::super::sync::HostEvent;
    use super::*;

    #[test]
    fn jobs_execute_in_order_and_signal() {
        let queue = HostQueue::spawn(QueueType::Transfer, "test").unwrap();
        let heap = HostHeap::new(1024);
        let a = Allocation::new(&heap, 4, AllocationShape::Buffer, "a").unwrap();
        let b = Allocation::new(&heap, 4, AllocationShape::Buffer, "b").unwrap();
        a.bytes().copy_from_slice(&[1, 2, 3, 4]);

        let done = HostEvent::new(false);
        queue
            .submit(HostJob {
                ops: vec![HostOp::CopyBuffer {
                    src: a.clone(),
                    src_offset: 0,
                    dst: b.clone(),
                    dst_offset: 0,
                    size: 4,
                }],
                signals: vec![SyncSignal::Event(done.clone())],
                ..HostJob::default()
            })
            .unwrap();

        done.wait();
        queue.wait_idle();
        assert!(queue.is_idle());
        assert_eq!(&b.bytes()[..], &[1, 2, 3, 4]);
        assert_eq!(queue.stats().copies, 1);
    }

    #[test]
    fn a_job_waits_for_its_semaphore() {
        let queue = HostQueue::spawn(QueueType::Graphics, "test").unwrap();
        let gate = HostTimeline::new(0);
        queue
            .submit(HostJob {
                waits: vec![SyncWait::Timeline(gate.clone(), 1)],
                ops: vec![HostOp::Draw {
                    elements: 3,
                    instances: 1,
                }],
                ..HostJob::default()
            })
            .unwrap();

        assert_eq!(queue.stats().draws, 0);
        gate.signal(1);
        queue.wait_idle();
        assert_eq!(queue.stats().draws, 1);
    }
}
