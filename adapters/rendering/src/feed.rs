//! Subscription handle that buffers mission states for a presentation loop.

use std::{cell::RefCell, rc::Rc};

use crop_mission_channel::{MissionChannel, SubscriptionId};
use crop_mission_core::MissionState;
use tracing::debug;

#[derive(Debug, Default)]
struct Slot {
    latest: Option<MissionState>,
    updates: u64,
    unseen: bool,
}

/// Keeps the latest mission state delivered on a key.
///
/// The subscription is cancelled when the feed is dropped, so a renderer that
/// goes away never keeps receiving updates.
pub struct MissionFeed<C: MissionChannel> {
    channel: C,
    subscription: SubscriptionId,
    slot: Rc<RefCell<Slot>>,
}

impl<C: MissionChannel> MissionFeed<C> {
    /// Subscribes to `key` on the provided channel.
    ///
    /// The channel delivers the current value immediately, so the feed is
    /// already populated when a state was published earlier.
    pub fn subscribe(channel: C, key: &str) -> Self {
        let slot = Rc::new(RefCell::new(Slot::default()));
        let sink = Rc::clone(&slot);
        let subscription = channel.subscribe(
            key,
            Box::new(move |state: Option<&MissionState>| {
                let mut slot = sink.borrow_mut();
                slot.latest = state.cloned();
                slot.updates += 1;
                slot.unseen = true;
            }),
        );
        debug!(key, subscription = subscription.get(), "mission feed subscribed");
        Self {
            channel,
            subscription,
            slot,
        }
    }

    /// Latest delivered state, if any.
    #[must_use]
    pub fn latest(&self) -> Option<MissionState> {
        self.slot.borrow().latest.clone()
    }

    /// Returns the latest state when it arrived after the previous call.
    pub fn take_update(&mut self) -> Option<Option<MissionState>> {
        let mut slot = self.slot.borrow_mut();
        if !slot.unseen {
            return None;
        }
        slot.unseen = false;
        Some(slot.latest.clone())
    }

    /// Number of deliveries received, including the initial one.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.slot.borrow().updates
    }

    /// Identifier of the underlying subscription.
    #[must_use]
    pub const fn subscription(&self) -> SubscriptionId {
        self.subscription
    }
}

impl<C: MissionChannel> Drop for MissionFeed<C> {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.subscription);
        debug!(
            subscription = self.subscription.get(),
            "mission feed unsubscribed"
        );
    }
}

impl<C: MissionChannel> std::fmt::Debug for MissionFeed<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionFeed")
            .field("subscription", &self.subscription)
            .field("slot", &self.slot.borrow())
            .finish()
    }
}
