//! Binding of reloadable components to push topics
//!
//! A [`TopicBinder`] wraps a component and keeps it subscribed to the topics
//! derived from its current props. Every push message on one of those topics
//! becomes a call to [`Reloadable::reload`]. The component itself is never
//! recreated, so whatever state it holds (selected chart point, date
//! filters) survives the reloads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::transport::{MessageHandler, PushTransport, SubscriptionHandle};
use crate::config::RealTimeUpdatesConfig;

/// The refresh path of a component: repeat its last data load
pub trait Reloadable: Send + Sync + 'static {
    fn reload(&self);
}

/// Open while a binding holds its subscriptions
///
/// Reloads run under the read lock. Closing takes the write lock, so once
/// `close` returns no reload is running and none can start, whatever thread
/// the transport delivers on.
#[derive(Clone)]
struct ReloadGate(Arc<RwLock<bool>>);

impl ReloadGate {
    fn open() -> Self {
        Self(Arc::new(RwLock::new(true)))
    }

    fn is_open(&self) -> bool {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` if the gate is open; returns whether it was
    fn run_if_open(&self, f: impl FnOnce()) -> bool {
        let open = self.0.read().unwrap_or_else(PoisonError::into_inner);
        if *open {
            f();
        }
        *open
    }

    fn close(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

/// Subscriptions held on behalf of one binding
///
/// Dropping the value is the only way subscriptions are released, whether
/// the component unmounts, real-time updates get disabled or the topics
/// change.
struct ActiveSubscriptions {
    transport: Arc<dyn PushTransport>,
    topics: Vec<String>,
    handles: Vec<SubscriptionHandle>,
    gate: ReloadGate,
    flusher: Option<JoinHandle<()>>,
}

impl ActiveSubscriptions {
    fn acquire<C: Reloadable>(
        transport: Arc<dyn PushTransport>,
        topics: Vec<String>,
        component: &Arc<C>,
        interval: Duration,
    ) -> Self {
        let gate = ReloadGate::open();
        let runtime = if interval.is_zero() {
            None
        } else {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => Some(runtime),
                Err(_) => {
                    warn!("No tokio runtime for batched updates, forwarding messages immediately");
                    None
                }
            }
        };

        let (handler, flusher): (MessageHandler, _) = match runtime {
            None => {
                let component = Arc::clone(component);
                let gate = gate.clone();
                let handler: MessageHandler = Arc::new(move || {
                    gate.run_if_open(|| component.reload());
                });
                (handler, None)
            }
            Some(runtime) => {
                let stale = Arc::new(AtomicBool::new(false));
                let handler: MessageHandler = {
                    let gate = gate.clone();
                    let stale = Arc::clone(&stale);
                    Arc::new(move || {
                        if gate.is_open() {
                            stale.store(true, Ordering::SeqCst);
                        }
                    })
                };
                let flusher = runtime.spawn(flush_pending(
                    Arc::clone(component),
                    gate.clone(),
                    stale,
                    interval,
                ));
                (handler, Some(flusher))
            }
        };

        let handles = topics
            .iter()
            .map(|topic| transport.subscribe(topic, Arc::clone(&handler)))
            .collect();

        debug!(?topics, ?interval, "Bound component to real-time updates");

        Self {
            transport,
            topics,
            handles,
            gate,
            flusher,
        }
    }
}

impl Drop for ActiveSubscriptions {
    fn drop(&mut self) {
        // Handlers still referenced by the transport become inert first
        self.gate.close();

        for handle in self.handles.drain(..) {
            self.transport.unsubscribe(&handle);
        }
        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }

        debug!(topics = ?self.topics, "Released real-time update subscriptions");
    }
}

/// Forward at most one reload per interval while messages keep arriving
async fn flush_pending<C: Reloadable>(
    component: Arc<C>,
    gate: ReloadGate,
    stale: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    // Skip the first tick which fires immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let open = gate.run_if_open(|| {
            if stale.swap(false, Ordering::SeqCst) {
                debug!("Forwarding batched real-time updates");
                component.reload();
            }
        });
        if !open {
            break;
        }
    }
}

/// Keeps a component subscribed to the topics computed from its props
pub struct TopicBinder<C, P, F>
where
    C: Reloadable,
    F: Fn(&P) -> Vec<String>,
{
    component: Arc<C>,
    topics_for: F,
    transport: Option<Arc<dyn PushTransport>>,
    config: RealTimeUpdatesConfig,
    enabled: bool,
    props: Option<P>,
    subscriptions: Option<ActiveSubscriptions>,
}

impl<C, P, F> TopicBinder<C, P, F>
where
    C: Reloadable,
    F: Fn(&P) -> Vec<String>,
{
    /// Wrap `component`
    ///
    /// Without a transport, or with real-time updates disabled, the binder is
    /// a passthrough and the component relies on manual reloads only.
    pub fn new(
        component: Arc<C>,
        topics_for: F,
        transport: Option<Arc<dyn PushTransport>>,
        config: &RealTimeUpdatesConfig,
    ) -> Self {
        Self {
            component,
            topics_for,
            transport,
            config: config.clone(),
            enabled: config.enabled,
            props: None,
            subscriptions: None,
        }
    }

    pub fn component(&self) -> &Arc<C> {
        &self.component
    }

    pub fn props(&self) -> Option<&P> {
        self.props.as_ref()
    }

    /// Topics currently subscribed to, empty when not bound
    pub fn topics(&self) -> &[String] {
        self.subscriptions
            .as_ref()
            .map(|s| s.topics.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_bound(&self) -> bool {
        self.subscriptions.is_some()
    }

    pub fn mount(&mut self, props: P) {
        self.props = Some(props);
        self.bind();
    }

    /// Pass new props, resubscribing only when the topics they map to changed
    pub fn update(&mut self, props: P) {
        let topics = (self.topics_for)(&props);
        self.props = Some(props);

        let unchanged = match &self.subscriptions {
            Some(current) => current.topics == topics,
            None => !self.can_bind() || topics.is_empty(),
        };
        if !unchanged {
            self.bind();
        }
    }

    pub fn unmount(&mut self) {
        self.subscriptions = None;
        self.props = None;
    }

    /// Turn real-time updates on or off for this binding at runtime
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            if self.subscriptions.is_none() {
                self.bind();
            }
        } else {
            self.subscriptions = None;
        }
    }

    fn can_bind(&self) -> bool {
        self.enabled && self.config.enabled && self.transport.is_some()
    }

    fn bind(&mut self) {
        // Release before acquiring so topics never overlap
        self.subscriptions = None;

        if !self.can_bind() {
            debug!("Real-time updates unavailable, component relies on manual reloads");
            return;
        }
        let (Some(transport), Some(props)) = (&self.transport, &self.props) else {
            return;
        };

        let topics = (self.topics_for)(props);
        if topics.is_empty() {
            return;
        }

        self.subscriptions = Some(ActiveSubscriptions::acquire(
            Arc::clone(transport),
            topics,
            &self.component,
            self.config.interval,
        ));
    }
}
