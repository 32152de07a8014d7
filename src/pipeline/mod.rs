//! The streaming pipeline: block assembly, parsing, plugin chain, windowed
//! aggregation, and the bounded dispatch queue with its send worker pool.
//!
//! Two tasks run for the lifetime of one invocation. The producer owns all
//! aggregation state and suspends on the bounded queue when the network is
//! slow; the consumer drains the queue with a fixed ceiling on in-flight
//! sends. Stream exhaustion closes the queue, the workers drain, and both
//! sides finish before `run` returns.

pub mod window;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::clock::TimeSource;
use crate::plugins::Plugin;
use crate::sample::Sample;
use crate::sender::SampleSender;
use crate::trace::key::fold_trace;
use crate::trace::normalize::normalize_line;
use crate::trace::parse::parse_block;
use crate::trace::{Tags, Trace};

use self::window::Window;

/// Scalar knobs of the pipeline, validated by the configuration layer.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum window lifetime in seconds.
    pub interval_secs: u64,
    /// Cardinality flush trigger: distinct `(tag set, trace key)` pairs.
    pub batch_limit: usize,
    /// Capacity of the dispatch queue; the producer suspends beyond it.
    pub queue_capacity: usize,
    /// Maximum sends in flight simultaneously.
    pub concurrent_request_limit: usize,
}

pub struct Processor<S> {
    opts: PipelineOptions,
    aggregator: Aggregator,
    plugins: Vec<Box<dyn Plugin>>,
    sender: Arc<S>,
    clock: Arc<dyn TimeSource>,
}

impl<S> Processor<S>
where
    S: SampleSender + 'static,
{
    pub fn new(
        opts: PipelineOptions,
        aggregator: Aggregator,
        plugins: Vec<Box<dyn Plugin>>,
        sender: Arc<S>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            opts,
            aggregator,
            plugins,
            sender,
            clock,
        }
    }

    /// Runs the pipeline to completion over the given line source.
    pub async fn run<R>(mut self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let (tx, rx) = mpsc::channel::<Sample>(self.opts.queue_capacity);
        let sender = Arc::clone(&self.sender);
        let limit = self.opts.concurrent_request_limit;

        let (sent, ()) = tokio::join!(self.produce(reader, tx), consume(rx, sender, limit));

        info!(samples_sent = sent, "input stream drained");
        Ok(())
    }

    /// Reads sample blocks, aggregates them, and enqueues flushed windows.
    /// Returns the number of samples enqueued. Dropping the queue sender at
    /// the end marks the queue complete for the worker pool.
    async fn produce<R>(&mut self, reader: R, tx: mpsc::Sender<Sample>) -> usize
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut window = Window::starting_at(self.clock.unix_now(), self.opts.interval_secs);
        let mut block: Vec<String> = Vec::new();
        let mut sent = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "input stream read failed, draining");
                    break;
                }
            };

            let line = normalize_line(&line);
            if !line.is_empty() {
                block.push(line);
                continue;
            }

            if block.is_empty() {
                continue;
            }

            let lines_of_block = std::mem::take(&mut block);
            sent += self.accept_block(&lines_of_block, &mut window, &tx).await;
        }

        // A trailing block never terminated by a blank line is a torn
        // capture and is discarded, but buffered window state is not.
        let now = self.clock.unix_now();
        sent += self.flush(&mut window, now, &tx).await;
        sent
    }

    /// Parses and aggregates one block, flushing the window if a trigger
    /// fires. Returns the number of samples enqueued by this block.
    async fn accept_block(
        &mut self,
        block: &[String],
        window: &mut Window,
        tx: &mpsc::Sender<Sample>,
    ) -> usize {
        let (tags, trace) = match parse_block(block) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, block = ?block, "dropping malformed sample block");
                return 0;
            }
        };

        if trace.is_empty() {
            return 0;
        }

        let Some((tags, trace)) = self.apply_plugins(tags, trace) else {
            return 0;
        };

        let key = fold_trace(&trace);
        self.aggregator.add_trace(tags, &key);

        let now = self.clock.unix_now();
        if window.is_expired(now) || self.aggregator.count_grouped_traces() >= self.opts.batch_limit
        {
            return self.flush(window, now, tx).await;
        }

        0
    }

    /// Threads the sample through the plugin chain in order. `None` means a
    /// plugin returned an empty trace and the sample is excluded.
    fn apply_plugins(&self, mut tags: Tags, mut trace: Trace) -> Option<(Tags, Trace)> {
        for plugin in &self.plugins {
            (tags, trace) = plugin.process(tags, trace);
            if trace.is_empty() {
                debug!(plugin = plugin.name(), "sample excluded by plugin");
                return None;
            }
        }
        Some((tags, trace))
    }

    /// Materializes one sample per tag bucket, pushes them into the queue
    /// (suspending when it is full), and opens the next window.
    async fn flush(&mut self, window: &mut Window, now: u64, tx: &mpsc::Sender<Sample>) -> usize {
        let mut sent = 0usize;

        for (tags, samples) in self.aggregator.grouped_traces() {
            let sample = Sample {
                from_ts: window.start_ts,
                to_ts: now,
                samples,
                tags,
            };

            if tx.send(sample).await.is_err() {
                warn!("dispatch queue closed, dropping flushed sample");
                continue;
            }
            sent += 1;
        }

        self.aggregator.clear();
        window.reset(now);
        sent
    }
}

/// Drains the dispatch queue with at most `limit` sends in flight. Samples
/// stay queued while every permit is held, which is what backs the
/// producer's suspension. Returns once the queue is complete and all
/// in-flight sends have resolved.
async fn consume<S>(mut rx: mpsc::Receiver<Sample>, sender: Arc<S>, limit: usize)
where
    S: SampleSender + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(error = %e, "send pool semaphore closed");
                break;
            }
        };

        let Some(sample) = rx.recv().await else {
            break;
        };

        let sender = Arc::clone(&sender);
        in_flight.spawn(async move {
            let _permit = permit;
            if !sender.send_sample(&sample).await {
                debug!(
                    from = sample.from_ts,
                    to = sample.to_ts,
                    "sample send reported failure"
                );
            }
        });

        // Reap already-finished sends so the set stays bounded.
        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "send worker join failed");
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "send worker join failed");
        }
    }
}
