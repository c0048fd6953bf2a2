pub mod machine;
pub mod state;
pub mod ui;

pub use machine::{page_name, CaptureMachine, SaveOutcome};
pub use state::{CaptureMode, CaptureSession, FeedbackForm, FormSurface, Listener};
pub use ui::WidgetUi;
