//! # MatLib client session
//!
//! Binds material records to meshes of a loaded scene:
//! - Material instantiation from records and the channel naming convention
//! - Mesh-binding table with a bounded undo history
//! - Preset replay, one repository fetch per distinct SKU
//! - HTTP access to the repository and preset store
//!
//! Rendering is behind the [`Scene`] and [`TextureLoader`] traits.

pub mod error;
pub mod history;
pub mod instance;
pub mod preset_player;
pub mod scene;
pub mod session;
pub mod source;
pub mod texture;

pub use error::{ClientError, ClientResult};
pub use history::{ActionHistory, ActionHistoryEntry, ActionKind, HISTORY_CAPACITY};
pub use instance::{BuildOptions, MaterialBuilder, MaterialInstance, MaterialKind};
pub use preset_player::{apply_preset, PresetReport};
pub use scene::{Scene, SceneGraph};
pub use session::{BindingSession, RebindReport, UndoInfo, UndoReport};
pub use source::{HttpRepositoryClient, MaterialSource};
pub use texture::{FsTextureLoader, HttpTextureLoader, Texture, TextureLoader};
