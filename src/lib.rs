pub mod codec;
pub mod config;
pub mod drive;
pub mod editing;
pub mod editor;
pub mod element;
pub mod error;
pub mod events;
pub mod gate;
pub mod host;
pub mod registry;
pub mod sync;
pub mod value;

pub use codec::{ElementCodec, MirrorSource, RecordData, TangentPolicy};
pub use config::{ArrayEditingConfig, ArrayEditingOverrides};
pub use drive::{DriveMonitor, DriveState, EditorSessionId};
pub use editing::{ArrayEditing, EditorOutcome};
pub use editor::{EditorAdapter, ListEdit, ListStyle, RecordingAdapter, WidgetHandle, WidgetKind};
pub use element::{
    resolve_kind, ArrayElement, CurveKey, Element, ElementKind, ElementType, LinearKey, TubePoint,
};
pub use error::ProxyError;
pub use gate::{Direction, GateState, SuppressionGate};
pub use host::{ArrayId, EditorWorld, ListId, RecordId, UserId};
pub use registry::ProxyRegistry;
pub use sync::{SyncEngine, SyncStats};
pub use value::{Value, ValueType};

#[cfg(feature = "editor")]
pub use editor::EguiAdapter;
