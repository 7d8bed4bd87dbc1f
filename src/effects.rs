use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// Closed catalog of effect identifiers understood by the effect service.
///
/// Every identifier the controller accepts is listed here, and `as_str`
/// yields exactly the value the service expects in the `effect` form
/// field. The catalog is static configuration; it is not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectId {
    Vintage,
    BlackWhite,
    Cinematic,
    Lomo,
    Warm,
    Cool,
    Sharp,
    Soft,
    AnalogKodak,
    AnalogFuji,
    AnalogPolaroid,
    AnalogExpired,
    AnalogCrossProcess,
    AnalogLightLeak,
}

pub const CATALOG: [EffectId; 14] = [
    EffectId::Vintage,
    EffectId::BlackWhite,
    EffectId::Cinematic,
    EffectId::Lomo,
    EffectId::Warm,
    EffectId::Cool,
    EffectId::Sharp,
    EffectId::Soft,
    EffectId::AnalogKodak,
    EffectId::AnalogFuji,
    EffectId::AnalogPolaroid,
    EffectId::AnalogExpired,
    EffectId::AnalogCrossProcess,
    EffectId::AnalogLightLeak,
];

impl EffectId {
    /// Wire identifier sent to the effect service.
    pub fn as_str(self) -> &'static str {
        match self {
            EffectId::Vintage => "vintage",
            EffectId::BlackWhite => "black_white",
            EffectId::Cinematic => "cinematic",
            EffectId::Lomo => "lomo",
            EffectId::Warm => "warm",
            EffectId::Cool => "cool",
            EffectId::Sharp => "sharp",
            EffectId::Soft => "soft",
            EffectId::AnalogKodak => "analog_kodak",
            EffectId::AnalogFuji => "analog_fuji",
            EffectId::AnalogPolaroid => "analog_polaroid",
            EffectId::AnalogExpired => "analog_expired",
            EffectId::AnalogCrossProcess => "analog_cross_process",
            EffectId::AnalogLightLeak => "analog_light_leak",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectId::Vintage => "Vintage",
            EffectId::BlackWhite => "Black & White",
            EffectId::Cinematic => "Cinematic",
            EffectId::Lomo => "Lomo",
            EffectId::Warm => "Warm",
            EffectId::Cool => "Cool",
            EffectId::Sharp => "Sharp",
            EffectId::Soft => "Soft",
            EffectId::AnalogKodak => "Kodak Film",
            EffectId::AnalogFuji => "Fuji Film",
            EffectId::AnalogPolaroid => "Polaroid",
            EffectId::AnalogExpired => "Expired Film",
            EffectId::AnalogCrossProcess => "Cross Process",
            EffectId::AnalogLightLeak => "Light Leak",
        }
    }

    pub fn blurb(self) -> &'static str {
        match self {
            EffectId::Vintage => "Warm sepia tone with reduced saturation",
            EffectId::BlackWhite => "Classic monochrome conversion",
            EffectId::Cinematic => "High contrast with moody tones",
            EffectId::Lomo => "Saturated colors with dark vignette",
            EffectId::Warm => "Enhanced reds for cozy feeling",
            EffectId::Cool => "Enhanced blues for crisp look",
            EffectId::Sharp => "Enhanced edge definition",
            EffectId::Soft => "Gentle blur for dreamy effect",
            EffectId::AnalogKodak => "Classic warm film stock with grain",
            EffectId::AnalogFuji => "Cool tones with enhanced greens",
            EffectId::AnalogPolaroid => "Instant film with warm cast",
            EffectId::AnalogExpired => "Degraded film with color shifts",
            EffectId::AnalogCrossProcess => "Inverted color processing effect",
            EffectId::AnalogLightLeak => "Film exposure with orange glow",
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOG
            .iter()
            .copied()
            .find(|effect| effect.as_str() == s)
            .ok_or_else(|| SessionError::UnknownEffect(s.to_string()))
    }
}
