// Application layer - Controller and use case interactors

pub mod container;
pub mod controller;
pub mod inspect_interactor;
pub mod progress;

// Re-export application types
pub use container::{AppContainer, DefaultAppContainer};
pub use controller::{ControllerOptions, StickerController};
pub use inspect_interactor::{InspectInteractor, InspectReport};
pub use progress::{ConsoleProgressObserver, JsonProgressObserver, ProgressObserver};
