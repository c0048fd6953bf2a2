pub mod queued_spike;

pub use queued_spike::QueuedSpike;
