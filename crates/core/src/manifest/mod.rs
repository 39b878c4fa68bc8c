//! Canonical view of extracted content.
//!
//! The decompiler writes frames either into `<out>/frames/` or straight into
//! `<out>/`. [`reconcile`] picks one of the two layouts and returns a
//! numerically ordered [`ContentManifest`] that every later step consumes.

mod reconcile;
mod types;

pub use reconcile::{compare_frame_names, frame_index, reconcile};
pub use types::{
    ContentManifest, FrameLayout, AUDIO_EXTENSIONS, FALLBACK_AUDIO_FILE, FRAMES_DIR,
    FRAME_EXTENSIONS, SOUNDS_DIR,
};
