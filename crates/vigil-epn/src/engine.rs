//! [`NetworkEngine`] — subject routing, per-key serialization, retry.

use std::{
  collections::HashMap,
  future::Future,
  pin::Pin,
  sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
  },
};

use serde::Serialize;
use tokio::{
  sync::{Mutex, RwLock, mpsc},
  task::JoinHandle,
  time,
};
use tracing::{debug, warn};
use uuid::Uuid;

use vigil_core::{
  event::{ActivityEvent, EventList},
  node::{EventProcessor, KeyState, NodeOutput, ProcessorError},
  notify::{ActivityValidator, DeliveryFailure, FailureSink, NotificationListener, SituationSink},
};

use crate::{BackpressurePolicy, EngineConfig, Error, Result};

// ─── Internal types ──────────────────────────────────────────────────────────

/// One queued unit of work for a (node, key) worker.
///
/// The processor reference is snapshotted at publish time, so deliveries
/// already matched to a node set complete against that set even if the
/// registration changes while they are in flight.
struct Delivery {
  subject:   String,
  events:    EventList,
  processor: Arc<dyn EventProcessor>,
}

struct Registration {
  name:      String,
  processor: Arc<dyn EventProcessor>,
}

// ─── Ingest report ───────────────────────────────────────────────────────────

/// An event rejected by the validation collaborator at the ingestion
/// boundary.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedEvent {
  pub id:     Uuid,
  pub reason: String,
}

/// Outcome of one [`NetworkEngine::ingest`] call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
  pub accepted: usize,
  pub rejected: Vec<RejectedEvent>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The event processing network engine.
///
/// Owns the subject → node graph and the per-(node, key) delivery queues.
/// Collaborators (situation sink, failure sink, validator) are injected at
/// construction and never looked up at runtime.
pub struct NetworkEngine {
  cfg:           EngineConfig,
  registrations: RwLock<HashMap<String, Vec<Arc<Registration>>>>,
  listeners:     RwLock<HashMap<String, Vec<Arc<dyn NotificationListener>>>>,
  /// (node name, partition key) → sender into that worker's queue.
  queues:        Mutex<HashMap<(String, String), mpsc::Sender<Delivery>>>,
  workers:       Mutex<Vec<JoinHandle<()>>>,
  situations:    Arc<dyn SituationSink>,
  failures:      Arc<dyn FailureSink>,
  validator:     Arc<dyn ActivityValidator>,
  shutting_down: AtomicBool,
}

impl NetworkEngine {
  /// Build an engine. Returned as `Arc` because worker tasks hold a weak
  /// reference back to it for re-entrant publishing.
  pub fn new(
    cfg: EngineConfig,
    situations: Arc<dyn SituationSink>,
    failures: Arc<dyn FailureSink>,
    validator: Arc<dyn ActivityValidator>,
  ) -> Arc<Self> {
    Arc::new(Self {
      cfg,
      registrations: RwLock::new(HashMap::new()),
      listeners: RwLock::new(HashMap::new()),
      queues: Mutex::new(HashMap::new()),
      workers: Mutex::new(Vec::new()),
      situations,
      failures,
      validator,
      shutting_down: AtomicBool::new(false),
    })
  }

  // ── Graph management ──────────────────────────────────────────────────────

  /// Register `processor` under a stable node `name` on `subject`.
  /// Re-registering a name on the same subject replaces the processor for
  /// subsequently published events only.
  pub async fn register_node(
    &self,
    subject: &str,
    name: &str,
    processor: Arc<dyn EventProcessor>,
  ) {
    let registration = Arc::new(Registration {
      name: name.to_owned(),
      processor,
    });

    let mut registrations = self.registrations.write().await;
    let entries = registrations.entry(subject.to_owned()).or_default();
    entries.retain(|r| r.name != name);
    entries.push(registration);

    debug!(subject, node = name, "node registered");
  }

  /// Remove the node `name` from `subject`. Deliveries already queued for
  /// the node drain normally.
  pub async fn unregister_node(&self, subject: &str, name: &str) {
    let mut registrations = self.registrations.write().await;
    if let Some(entries) = registrations.get_mut(subject) {
      entries.retain(|r| r.name != name);
      if entries.is_empty() {
        registrations.remove(subject);
      }
    }

    debug!(subject, node = name, "node unregistered");
  }

  /// Register a listener receiving a callback for every publish on
  /// `subject`.
  pub async fn subscribe(&self, subject: &str, listener: Arc<dyn NotificationListener>) {
    self
      .listeners
      .write()
      .await
      .entry(subject.to_owned())
      .or_default()
      .push(listener);
  }

  // ── Publishing ────────────────────────────────────────────────────────────

  /// Deliver `events` to every node registered on `subject`.
  ///
  /// The node set is snapshotted once per call — a registration change
  /// mid-publish is never partially visible. Per (node, key), lists are
  /// enqueued in submission order and processed one at a time; the caller
  /// blocks only on bounded-queue backpressure (or receives
  /// [`Error::QueueFull`] under the `Reject` policy).
  pub async fn publish(self: &Arc<Self>, subject: &str, events: EventList) -> Result<()> {
    if self.shutting_down.load(Ordering::SeqCst) {
      return Err(Error::ShutDown);
    }

    if let Some(listeners) = self.listeners.read().await.get(subject) {
      for listener in listeners {
        listener.notify(subject, &events);
      }
    }

    let snapshot: Vec<Arc<Registration>> = self
      .registrations
      .read()
      .await
      .get(subject)
      .cloned()
      .unwrap_or_default();

    for registration in snapshot {
      self
        .deliver(
          &registration,
          Delivery {
            subject:   subject.to_owned(),
            events:    events.clone(),
            processor: registration.processor.clone(),
          },
        )
        .await?;
    }

    Ok(())
  }

  /// The ingestion boundary: validate, group by partition key, publish one
  /// list per key. A rejected event halts only itself; the rest of the
  /// batch continues in arrival order.
  pub async fn ingest(
    self: &Arc<Self>,
    subject: &str,
    events: Vec<ActivityEvent>,
  ) -> Result<IngestReport> {
    let mut rejected = Vec::new();
    let mut groups: Vec<(String, Vec<ActivityEvent>)> = Vec::new();

    for event in events {
      if let Err(reason) = self.validator.validate(&event) {
        warn!(event_id = %event.id, %reason, "event rejected by validator");
        rejected.push(RejectedEvent { id: event.id, reason });
        continue;
      }

      let key = event.partition_key();
      match groups.iter_mut().find(|(k, _)| *k == key) {
        Some((_, batch)) => batch.push(event),
        None => groups.push((key, vec![event])),
      }
    }

    let mut accepted = 0;
    for (_, batch) in groups {
      accepted += batch.len();
      let list = EventList::new(batch)?;
      self.publish(subject, list).await?;
    }

    Ok(IngestReport { accepted, rejected })
  }

  /// Close all delivery queues and wait for the workers to drain them.
  /// Publishes issued after this point fail with [`Error::ShutDown`].
  pub async fn shutdown(&self) {
    self.shutting_down.store(true, Ordering::SeqCst);
    self.queues.lock().await.clear();

    let workers = std::mem::take(&mut *self.workers.lock().await);
    for worker in workers {
      if let Err(err) = worker.await {
        warn!(%err, "worker task aborted during shutdown");
      }
    }
  }

  // ── Delivery internals ────────────────────────────────────────────────────

  async fn deliver(self: &Arc<Self>, registration: &Registration, delivery: Delivery) -> Result<()> {
    let key = delivery.events.key().to_owned();
    let queue_key = (registration.name.clone(), key.clone());

    let tx = {
      let mut queues = self.queues.lock().await;
      match queues.get(&queue_key) {
        Some(tx) => tx.clone(),
        None => {
          let (tx, rx) = mpsc::channel(self.cfg.queue_depth);
          let worker = tokio::spawn(run_worker(
            Arc::downgrade(self),
            self.cfg.clone(),
            registration.name.clone(),
            key,
            rx,
          ));
          self.workers.lock().await.push(worker);
          queues.insert(queue_key, tx.clone());
          tx
        }
      }
    };

    match self.cfg.backpressure {
      BackpressurePolicy::Block => {
        tx.send(delivery).await.map_err(|_| Error::ShutDown)?;
      }
      BackpressurePolicy::Reject => {
        use mpsc::error::TrySendError;
        tx.try_send(delivery).map_err(|err| match err {
          TrySendError::Full(d) => Error::QueueFull {
            node: registration.name.clone(),
            key:  d.events.key().to_owned(),
          },
          TrySendError::Closed(_) => Error::ShutDown,
        })?;
      }
    }

    Ok(())
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

/// One task per (node, key): owns that key's state and drains its queue in
/// FIFO order. Exits when the engine drops the queue's sender.
///
/// Returns a boxed future: workers spawn through `deliver`, which this loop
/// re-enters via `publish`, and the indirection keeps that recursive future
/// type finite.
fn run_worker(
  engine: Weak<NetworkEngine>,
  cfg: EngineConfig,
  node: String,
  key: String,
  mut rx: mpsc::Receiver<Delivery>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
  Box::pin(async move {
    let mut state = KeyState::default();

    while let Some(delivery) = rx.recv().await {
      let mut attempts: u32 = 0;

      let outcome = loop {
        attempts += 1;

        let invocation = delivery.processor.process(&key, &delivery.events, &mut state);
        let result = match time::timeout(cfg.process_timeout(), invocation).await {
          Ok(result) => result,
          Err(_) => Err(ProcessorError::Transient(format!(
            "invocation exceeded {}ms budget",
            cfg.process_timeout_ms
          ))),
        };

        match result {
          Ok(output) => break Ok(output),
          Err(ProcessorError::Transient(msg)) if attempts <= cfg.max_retries => {
            debug!(%node, %key, attempts, %msg, "transient failure, retrying");
            time::sleep(cfg.retry_backoff() * attempts).await;
          }
          Err(err) => break Err(err),
        }
      };

      match outcome {
        Ok(output) => {
          if let Some(engine) = engine.upgrade() {
            dispatch_output(&engine, &node, output).await;
          }
        }
        Err(err) => {
          warn!(%node, %key, attempts, %err, "delivery failed");
          if let Some(engine) = engine.upgrade() {
            engine.failures.report(DeliveryFailure {
              node:     node.clone(),
              subject:  delivery.subject.clone(),
              key:      key.clone(),
              attempts,
              error:    err.to_string(),
            });
          }
        }
      }
    }
  })
}

/// Fan a node's output back into the engine: forwards re-enter as fresh
/// publishes (enqueue-and-return — never a nested invocation), terminal
/// situations go to the sink.
async fn dispatch_output(engine: &Arc<NetworkEngine>, node: &str, output: NodeOutput) {
  for (subject, events) in output.forwards {
    match EventList::new(events) {
      Ok(list) => {
        if let Err(err) = engine.publish(&subject, list).await {
          warn!(node, %subject, %err, "failed to publish derived events");
        }
      }
      Err(err) => {
        warn!(node, %subject, %err, "node emitted an invalid event batch");
      }
    }
  }

  if let Some(situation) = output.situation {
    debug!(node, situation = %situation.id, "forwarding terminal situation");
    engine.situations.accept(situation).await;
  }
}
