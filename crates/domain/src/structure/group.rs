//! Rooms and categories: the two groupings every control may belong to.

/// A room in the installation.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub uuid: String,
    pub name: String,
    /// Raw `type` value; the device uses numbers for rooms.
    pub kind: Option<serde_json::Value>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub is_favorite: bool,
    pub is_secured: bool,
}

impl Room {
    #[must_use]
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            kind: None,
            image: None,
            color: None,
            is_favorite: false,
            is_secured: false,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A functional category (lights, shading, climate, …).
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub uuid: String,
    pub name: String,
    /// Raw `type` value, usually a string such as `"lights"`.
    pub kind: Option<serde_json::Value>,
    pub image: Option<String>,
    pub is_favorite: bool,
    pub is_secured: bool,
}

impl Category {
    #[must_use]
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            kind: None,
            image: None,
            is_favorite: false,
            is_secured: false,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}
