//! Time-keyed key and button state histories.
//!
//! The manager records every key and button transition into append-only
//! histories. A track captures a [`HistoryHolder`] at its creation tick;
//! the holder pins the history at that instant, so queries made through it
//! keep answering from the snapshot timeline even while the session keeps
//! appending newer events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Host timestamp in integer ticks. The tick-to-seconds mapping comes from
/// the manager configuration.
pub type Ticks = i64;

/// Identifies one input device (mouse, stylus, touch panel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceId(pub i64);

/// Identifies one touch/contact on a device. Synthetic touches come from
/// [`crate::input::InputManager::gen_touch_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TouchId(pub i64);

/// Host keyboard key code, opaque to the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub u32);

/// Host pointer button code, opaque to the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button(pub u32);

/// Persistent set of currently pressed keys or buttons.
///
/// Implemented as a structurally shared chain so that history snapshots
/// stay cheap: pressing prepends a node, releasing rebuilds the short
/// chain without the released entry. Past snapshots keep their nodes.
#[derive(Debug, Clone, Default)]
pub struct PressedSet<K: Copy + Eq>(Option<Rc<Node<K>>>);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<Rc<Node<K>>>,
}

impl<K: Copy + Eq> PressedSet<K> {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// True if `key` is in the set.
    pub fn is_pressed(&self, key: K) -> bool {
        let mut node = self.0.as_ref();
        while let Some(n) = node {
            if n.key == key {
                return true;
            }
            node = n.prev.as_ref();
        }
        false
    }

    /// Returns a set with `key` added. No-op if already pressed.
    pub fn with_pressed(&self, key: K) -> Self {
        if self.is_pressed(key) {
            return self.clone();
        }
        Self(Some(Rc::new(Node {
            key,
            prev: self.0.clone(),
        })))
    }

    /// Returns a set with `key` removed. No-op if not pressed.
    pub fn with_released(&self, key: K) -> Self {
        if !self.is_pressed(key) {
            return self.clone();
        }
        let mut keys = self.keys();
        keys.retain(|k| *k != key);
        let mut set = Self::new();
        for k in keys {
            set = set.with_pressed(k);
        }
        set
    }

    /// All keys in the set, most recent press first.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::new();
        let mut node = self.0.as_ref();
        while let Some(n) = node {
            out.push(n.key);
            node = n.prev.as_ref();
        }
        out
    }
}

/// Append-only log of pressed-set snapshots keyed by ticks.
#[derive(Debug)]
pub struct History<K: Copy + Eq> {
    entries: Vec<(Ticks, PressedSet<K>)>,
}

/// Shared handle to a history, owned by the input state and referenced by
/// track holders.
pub type HistoryRef<K> = Rc<RefCell<History<K>>>;

impl<K: Copy + Eq> History<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a press or release. Out-of-order timestamps are treated as
    /// happening at the latest recorded tick.
    pub fn event(&mut self, press: bool, key: K, ticks: Ticks) {
        let ticks = match self.entries.last() {
            Some((last, _)) => ticks.max(*last),
            None => ticks,
        };
        let current = self.get(ticks);
        let next = if press {
            current.with_pressed(key)
        } else {
            current.with_released(key)
        };
        self.entries.push((ticks, next));
    }

    /// Returns the pressed set at or immediately before `ticks`.
    pub fn get(&self, ticks: Ticks) -> PressedSet<K> {
        let idx = self.entries.partition_point(|(t, _)| *t <= ticks);
        if idx == 0 {
            PressedSet::new()
        } else {
            self.entries[idx - 1].1.clone()
        }
    }
}

impl<K: Copy + Eq> Default for History<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pins a history at a track's creation instant.
///
/// Queries take track-relative time in seconds and resolve it back to
/// ticks with the same mapping the manager used when the track was born.
#[derive(Debug, Clone)]
pub struct HistoryHolder<K: Copy + Eq> {
    history: HistoryRef<K>,
    ticks: Ticks,
    tick_seconds: f64,
}

impl<K: Copy + Eq> HistoryHolder<K> {
    pub fn new(history: HistoryRef<K>, ticks: Ticks, tick_seconds: f64) -> Self {
        Self {
            history,
            ticks,
            tick_seconds,
        }
    }

    /// The pinned tick of this holder.
    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// Pressed set at `time` seconds after the pinned tick.
    pub fn get(&self, time: f64) -> PressedSet<K> {
        let offset = (time / self.tick_seconds).round() as Ticks;
        self.history.borrow().get(self.ticks + offset)
    }
}

pub type KeyHistoryHolder = HistoryHolder<Key>;
pub type ButtonHistoryHolder = HistoryHolder<Button>;

/// Session-wide input state: one global key history plus one button
/// history per device.
#[derive(Debug, Default)]
pub struct InputState {
    key_history: Option<HistoryRef<Key>>,
    button_histories: HashMap<DeviceId, HistoryRef<Button>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_history(&mut self) -> HistoryRef<Key> {
        self.key_history
            .get_or_insert_with(|| Rc::new(RefCell::new(History::new())))
            .clone()
    }

    fn button_history(&mut self, device_id: DeviceId) -> HistoryRef<Button> {
        self.button_histories
            .entry(device_id)
            .or_insert_with(|| Rc::new(RefCell::new(History::new())))
            .clone()
    }

    /// Records a key transition.
    pub fn key_event(&mut self, press: bool, key: Key, ticks: Ticks) {
        self.key_history().borrow_mut().event(press, key, ticks);
    }

    /// Records a button transition on one device.
    pub fn button_event(&mut self, press: bool, device_id: DeviceId, button: Button, ticks: Ticks) {
        self.button_history(device_id)
            .borrow_mut()
            .event(press, button, ticks);
    }

    /// Holder pinning the key history at `ticks`.
    pub fn key_holder(&mut self, ticks: Ticks, tick_seconds: f64) -> KeyHistoryHolder {
        HistoryHolder::new(self.key_history(), ticks, tick_seconds)
    }

    /// Holder pinning one device's button history at `ticks`.
    pub fn button_holder(
        &mut self,
        device_id: DeviceId,
        ticks: Ticks,
        tick_seconds: f64,
    ) -> ButtonHistoryHolder {
        HistoryHolder::new(self.button_history(device_id), ticks, tick_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_set_press_release() {
        let set = PressedSet::new().with_pressed(Key(1)).with_pressed(Key(2));
        assert!(set.is_pressed(Key(1)));
        assert!(set.is_pressed(Key(2)));
        let set = set.with_released(Key(1));
        assert!(!set.is_pressed(Key(1)));
        assert!(set.is_pressed(Key(2)));
        // releasing an absent key is a no-op
        let set = set.with_released(Key(9));
        assert!(set.is_pressed(Key(2)));
    }

    #[test]
    fn history_lookup_returns_state_at_or_before() {
        let mut history = History::new();
        history.event(true, Key(1), 10);
        history.event(true, Key(2), 20);
        history.event(false, Key(1), 30);

        assert!(history.get(5).is_empty());
        assert!(history.get(10).is_pressed(Key(1)));
        assert!(!history.get(15).is_pressed(Key(2)));
        assert!(history.get(25).is_pressed(Key(1)));
        assert!(!history.get(30).is_pressed(Key(1)));
        assert!(history.get(100).is_pressed(Key(2)));
    }

    #[test]
    fn out_of_order_events_land_at_latest_tick() {
        let mut history = History::new();
        history.event(true, Key(1), 50);
        history.event(true, Key(2), 10); // late; recorded at tick 50
        assert!(history.get(49).is_empty());
        assert!(history.get(50).is_pressed(Key(2)));
    }

    #[test]
    fn holder_snapshot_survives_later_events() {
        let mut state = InputState::new();
        state.key_event(true, Key(7), 100);
        let holder = state.key_holder(100, 0.001);

        // a later release must not alter what the holder reports for the past
        state.key_event(false, Key(7), 200);
        assert!(holder.get(0.0).is_pressed(Key(7)));
        assert!(holder.get(0.05).is_pressed(Key(7)));
        assert!(!holder.get(0.1).is_pressed(Key(7)));
    }

    #[test]
    fn button_histories_are_per_device() {
        let mut state = InputState::new();
        state.button_event(true, DeviceId(1), Button(0), 10);
        let a = state.button_holder(DeviceId(1), 10, 0.001);
        let b = state.button_holder(DeviceId(2), 10, 0.001);
        assert!(a.get(0.0).is_pressed(Button(0)));
        assert!(b.get(0.0).is_empty());
    }
}
