//! Integration tests for the parallel fan-out action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eventgate::{
    DispatchError, DispatcherRef, ParallelFanOut, QueueDispatcher, SubStream, Subscriber,
    Subscription, SyncDispatcher, RESERVED_SLOTS,
};

fn sync_dispatchers() -> impl FnMut() -> DispatcherRef {
    || Arc::new(SyncDispatcher) as DispatcherRef
}

/// Lane subscriber recording elements and termination signals.
struct LaneProbe {
    auto_request: u64,
    log: Mutex<Vec<String>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl LaneProbe {
    fn new(auto_request: u64) -> Arc<Self> {
        Arc::new(Self {
            auto_request,
            log: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        })
    }

    fn received(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with("next:"))
            .count()
    }

    fn cancel(&self) {
        let subscription = self.subscription.lock().unwrap().clone();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

impl Subscriber<i32> for LaneProbe {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.auto_request > 0 {
            subscription.request(self.auto_request);
        }
        *self.subscription.lock().unwrap() = Some(subscription);
    }

    fn on_next(&self, element: i32) {
        self.log.lock().unwrap().push(format!("next:{element}"));
    }

    fn on_error(&self, error: DispatchError) {
        self.log
            .lock()
            .unwrap()
            .push(format!("error:{}", error.as_label()));
    }

    fn on_complete(&self) {
        self.log.lock().unwrap().push(String::from("complete"));
    }
}

/// Downstream of the master: collects the lanes themselves.
struct LaneCollector {
    lanes: Mutex<Vec<SubStream<i32>>>,
    completed: AtomicBool,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl LaneCollector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lanes: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
            subscription: Mutex::new(None),
        })
    }
}

impl Subscriber<SubStream<i32>> for LaneCollector {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock().unwrap() = Some(subscription);
    }

    fn on_next(&self, lane: SubStream<i32>) {
        self.lanes.lock().unwrap().push(lane);
    }

    fn on_complete(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }
}

/// Upstream stub recording the demand pulled through the master.
struct UpstreamProbe {
    requests: Mutex<Vec<u64>>,
}

impl Subscription for UpstreamProbe {
    fn request(&self, n: u64) {
        self.requests.lock().unwrap().push(n);
    }

    fn cancel(&self) {}
}

fn attach_probes(fan: &ParallelFanOut<i32>, auto_request: u64) -> Vec<Arc<LaneProbe>> {
    fan.lanes()
        .into_iter()
        .flatten()
        .map(|lane| {
            let probe = LaneProbe::new(auto_request);
            lane.subscribe(probe.clone());
            probe
        })
        .collect()
}

#[test]
fn round_robin_spreads_elements_evenly() {
    let fan = ParallelFanOut::<i32>::new(4, sync_dispatchers());
    fan.set_capacity(1024);
    let probes = attach_probes(&fan, 1024);

    for i in 0..1000 {
        fan.on_next(i);
    }

    let counts: Vec<usize> = probes.iter().map(|p| p.received()).collect();
    assert_eq!(counts.iter().sum::<usize>(), 1000);
    for count in counts {
        assert!((225..=275).contains(&count), "lane count {count} out of range");
    }
}

#[test]
fn cancelled_lane_never_receives_again() {
    let fan = ParallelFanOut::<i32>::new(2, sync_dispatchers());
    fan.set_capacity(1024);
    let probes = attach_probes(&fan, 1024);

    probes[0].cancel();
    for i in 0..10 {
        fan.on_next(i);
    }

    assert_eq!(probes[0].received(), 0);
    assert_eq!(probes[1].received(), 10);
    assert!(fan.lanes()[0].is_none());
}

#[test]
fn exhausted_demand_falls_back_to_last_existing_lane() {
    let fan = ParallelFanOut::<i32>::new(2, sync_dispatchers());
    fan.set_capacity(64);
    // Subscribed but requesting nothing: no lane ever has demand.
    let probes = attach_probes(&fan, 0);

    fan.on_next(7);

    let delivered: usize = probes.iter().map(|p| p.received()).sum();
    assert_eq!(delivered, 1, "element must not be dropped while lanes live");
}

#[test]
fn all_lanes_cancelled_drops_silently() {
    let fan = ParallelFanOut::<i32>::new(2, sync_dispatchers());
    let probes = attach_probes(&fan, 8);
    for probe in &probes {
        probe.cancel();
    }

    fan.on_next(1);

    assert_eq!(probes.iter().map(|p| p.received()).sum::<usize>(), 0);
    assert!(fan.lanes().iter().all(Option::is_none));
}

#[test]
fn capacity_policy_reserves_guard_slots() {
    let fan = ParallelFanOut::<i32>::new(4, sync_dispatchers());
    assert_eq!(fan.pool_size(), 4);

    fan.set_capacity(1024);
    assert_eq!(fan.capacity(), 1024 - 4 * RESERVED_SLOTS + RESERVED_SLOTS);
    for lane in fan.lanes().into_iter().flatten() {
        assert_eq!(lane.capacity(), 256);
    }

    // Below the guard the requested capacity is kept as-is.
    fan.set_capacity(64);
    assert_eq!(fan.capacity(), 64);
    for lane in fan.lanes().into_iter().flatten() {
        assert_eq!(lane.capacity(), 16);
    }

    // A share rounding to zero hands every lane the full budget.
    fan.set_capacity(2);
    assert_eq!(fan.capacity(), 2);
    for lane in fan.lanes().into_iter().flatten() {
        assert_eq!(lane.capacity(), 2);
    }
}

#[test]
fn demand_is_capped_at_lane_capacity() {
    let fan = ParallelFanOut::<i32>::new(4, sync_dispatchers());
    fan.set_capacity(1024);
    let probes = attach_probes(&fan, 100_000);

    for lane in fan.lanes().into_iter().flatten() {
        assert_eq!(lane.demand(), 256);
    }
    drop(probes);
}

#[test]
fn master_emits_lanes_on_request_then_completes() {
    let fan = ParallelFanOut::<i32>::new(3, sync_dispatchers());
    let collector = LaneCollector::new();
    fan.subscribe(collector.clone());

    let subscription = collector.subscription.lock().unwrap().clone().unwrap();
    subscription.request(2);
    assert_eq!(collector.lanes.lock().unwrap().len(), 2);
    assert!(!collector.completed.load(Ordering::SeqCst));

    subscription.request(5);
    let lanes = collector.lanes.lock().unwrap();
    assert_eq!(lanes.len(), 3);
    assert_eq!(
        lanes.iter().map(SubStream::index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(collector.completed.load(Ordering::SeqCst));
}

#[test]
fn lane_demand_pulls_from_upstream() {
    let fan = ParallelFanOut::<i32>::new(2, sync_dispatchers());
    let upstream = Arc::new(UpstreamProbe {
        requests: Mutex::new(Vec::new()),
    });
    fan.on_subscribe(upstream.clone());

    fan.set_capacity(256);
    let _probes = attach_probes(&fan, 10);

    assert_eq!(*upstream.requests.lock().unwrap(), vec![10, 10]);
    assert_eq!(fan.requested(), 20);
}

#[test]
fn error_broadcasts_to_downstream_and_lanes() {
    let fan = ParallelFanOut::<i32>::new(2, sync_dispatchers());
    fan.set_capacity(256);
    let probes = attach_probes(&fan, 8);

    fan.on_error(DispatchError::Closed);

    for probe in &probes {
        assert_eq!(
            *probe.log.lock().unwrap(),
            vec![String::from("error:dispatcher_closed")]
        );
    }
}

#[test]
fn second_lane_subscriber_is_rejected() {
    let fan = ParallelFanOut::<i32>::new(1, sync_dispatchers());
    fan.set_capacity(64);
    let first = attach_probes(&fan, 64).remove(0);

    let second = LaneProbe::new(64);
    let lane = fan.lanes().remove(0).unwrap();
    lane.subscribe(second.clone());
    assert!(second.subscription.lock().unwrap().is_none());

    fan.on_next(5);
    assert_eq!(first.received(), 1);
    assert_eq!(second.received(), 0);
}

#[tokio::test]
async fn termination_queues_behind_in_flight_elements() {
    let queues: Arc<Mutex<Vec<Arc<QueueDispatcher>>>> = Arc::new(Mutex::new(Vec::new()));
    let queues_in = Arc::clone(&queues);
    let fan = ParallelFanOut::<i32>::new(1, move || {
        let dispatcher = Arc::new(QueueDispatcher::unbounded());
        queues_in.lock().unwrap().push(Arc::clone(&dispatcher));
        dispatcher as DispatcherRef
    });
    fan.set_capacity(64);
    let probe = attach_probes(&fan, 64).remove(0);

    for i in 0..3 {
        fan.on_next(i);
    }
    fan.on_complete();

    let dispatcher = queues.lock().unwrap().remove(0);
    dispatcher.shutdown().await;

    assert_eq!(
        *probe.log.lock().unwrap(),
        vec![
            String::from("next:0"),
            String::from("next:1"),
            String::from("next:2"),
            String::from("complete"),
        ]
    );
}
