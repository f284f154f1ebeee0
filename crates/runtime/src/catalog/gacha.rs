use serde::{Deserialize, Serialize};

use crate::GachaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GachaKind {
    #[default]
    Normal,
    StepUp,
    Box,
}

impl GachaKind {
    /// Maps the stored `gacha_type` column. Anything from 4 upwards is a box gacha.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 | 1 => GachaKind::Normal,
            2 | 3 => GachaKind::StepUp,
            _ => GachaKind::Box,
        }
    }

    /// Lowest `gacha_type` of each kind.
    pub fn code(&self) -> u8 {
        match self {
            GachaKind::Normal => 0,
            GachaKind::StepUp => 2,
            GachaKind::Box => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gacha {
    pub id: GachaId,
    #[serde(default)]
    pub min_gr: u32,
    #[serde(default)]
    pub min_hr: u32,
    pub name: String,
    #[serde(default)]
    pub url_banner: String,
    #[serde(default)]
    pub url_feature: String,
    #[serde(default)]
    pub url_thumbnail: String,
    #[serde(default)]
    pub wide: bool,
    #[serde(default)]
    pub recommended: bool,
    /// Raw `gacha_type`; sent back to clients as stored.
    #[serde(default)]
    pub gacha_type: u8,
    #[serde(default)]
    pub hidden: bool,
}

impl Gacha {
    pub fn kind(&self) -> GachaKind {
        GachaKind::from_code(self.gacha_type)
    }

    pub fn is_visible_to(&self, hr: u32, gr: u32) -> bool {
        !self.hidden && hr >= self.min_hr && gr >= self.min_gr
    }
}
