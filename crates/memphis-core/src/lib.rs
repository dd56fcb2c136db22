pub mod audio;
pub mod body;
pub mod clock;
pub mod color;
pub mod config;
pub mod constants;
pub mod factory;
pub mod geometry;
pub mod music;
pub mod physics;
pub mod scene;
pub mod visuals;

pub use audio::{AudioBackend, AudioEngine, AudioError, CollisionNote, EntityId, FreezeState};
pub use body::{Body, BodyId};
pub use clock::{Clock, InstantClock, ManualClock};
pub use config::{AudioParams, PhysicsParams, SceneConfig};
pub use music::{Scale, Timbre};
pub use physics::{CollisionEvent, Simulation};
pub use scene::{FrameStats, Scene};
pub use visuals::{Renderer, Surface};
