use thiserror::Error;

/// Top-level error type for the Relievo extrusion engine.
#[derive(Debug, Error)]
pub enum RelievoError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Errors produced while normalizing raw vector markup into contours.
///
/// Parse errors are unrecoverable for the current document; the only
/// recovery path is a new document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document contains no path, circle, ellipse or rect primitives")]
    EmptyDocument,

    #[error("document contains primitives but no usable closed contour")]
    NoClosedContours,

    #[error("malformed number {token:?} in {context}")]
    MalformedNumber { token: String, context: String },

    #[error("incomplete arguments for path command '{command}'")]
    IncompleteCommand { command: char },

    #[error("unknown path command '{command}'")]
    UnknownCommand { command: char },
}

/// Errors produced while building 3D geometry from valid contours.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("shape group {group} has a degenerate outer boundary: {reason}")]
    DegenerateBoundary { group: usize, reason: String },

    #[error("triangulation of shape group {group} failed: {reason}")]
    Triangulation { group: usize, reason: String },
}

/// Errors produced while loading shared render resources.
///
/// Resource errors are non-fatal: rendering continues without the
/// resource and the geometry pipeline is unaffected.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("environment texture {url:?} failed to load: {reason}")]
    TextureLoad { url: String, reason: String },
}

/// Errors produced while reading the persisted session handoff.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no document found in the session store")]
    MissingDocument,
}

/// Errors produced while encoding an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("geometry result is empty; nothing to export")]
    EmptyGeometry,

    #[error("failed to encode glTF JSON chunk: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for results using [`RelievoError`].
pub type Result<T> = std::result::Result<T, RelievoError>;
