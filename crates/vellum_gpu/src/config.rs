//! Canvas configuration

/// Configuration for creating a [`Canvas`](crate::Canvas)
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasConfig {
    /// Generate anti-aliasing fringes around fills and strokes
    pub antialias: bool,
    /// Glyph atlas size in texels
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Vertex capacity reserved up front
    pub initial_vertices: usize,
    /// Draw call capacity reserved up front
    pub initial_commands: usize,
    /// How often one text run may reset a full atlas before giving up
    pub max_atlas_resets_per_text: u32,
    /// Curve samples turning sharper than this (cosine of the angle between
    /// segments) are treated as corners when joining strokes
    pub corner_threshold: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            antialias: false,
            atlas_width: 512,
            atlas_height: 512,
            initial_vertices: 4096,
            initial_commands: 256,
            max_atlas_resets_per_text: 1,
            corner_threshold: 0.5,
        }
    }
}

impl CanvasConfig {
    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn with_atlas_size(mut self, width: u32, height: u32) -> Self {
        self.atlas_width = width;
        self.atlas_height = height;
        self
    }

    pub fn with_initial_vertices(mut self, count: usize) -> Self {
        self.initial_vertices = count;
        self
    }

    pub fn with_initial_commands(mut self, count: usize) -> Self {
        self.initial_commands = count;
        self
    }

    pub fn with_max_atlas_resets(mut self, resets: u32) -> Self {
        self.max_atlas_resets_per_text = resets;
        self
    }

    pub fn with_corner_threshold(mut self, cosine: f32) -> Self {
        self.corner_threshold = cosine;
        self
    }
}
