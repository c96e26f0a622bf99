mod input;
mod loop_runner;
mod metrics;
mod nav;
mod scene;
mod signals;

pub use input::{InputAction, InputFeed, InputSnapshot, InputSource, KeyEdge, ScriptedInput};
pub use loop_runner::{run_headless, AppError, LoopConfig, LoopPacing, LoopSummary, StopReason};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use nav::{step_toward, NavBounds, Pathfinder, StraightLinePathfinder};
pub use scene::{
    Entity, EntityId, EntityIdAllocator, MarkerKind, MarkerSet, Pose, Scene, SceneCommand,
    SceneWorld, Vec3,
};
pub use signals::{DialogueOwner, Signal, SignalBus, SignalCounts, SignalKind, SignalKindSet, Subscription};
