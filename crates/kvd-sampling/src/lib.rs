//! Sampling profile: the seven numeric knobs that steer token selection
//! (spec.md §3, §4.3). Process-owned mutable singleton, persisted as a
//! compact JSON object with exactly these seven field names.

use serde::{Deserialize, Serialize};

/// The seven-field sampling record. Both supported model variants carry all
/// seven fields; an adapter that doesn't support `min_p` simply ignores it
/// (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingProfile {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub min_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub repeat_penalty: f32,
}

impl SamplingProfile {
    /// Defaults for the RWKV-branded variant (spec.md §3).
    pub fn rwkv_default() -> Self {
        Self {
            temperature: 0.70,
            top_p: 0.95,
            top_k: 40,
            min_p: 0.0,
            frequency_penalty: 0.20,
            presence_penalty: 0.10,
            repeat_penalty: 1.10,
        }
    }

    /// Defaults for the MAMBA-branded variant (spec.md §3).
    pub fn mamba_default() -> Self {
        Self {
            temperature: 0.18,
            top_p: 0.88,
            top_k: 0,
            min_p: 0.12,
            frequency_penalty: 0.00,
            presence_penalty: 0.00,
            repeat_penalty: 1.00,
        }
    }

    /// Get a single field by its `/x` command name. Returns `None` for an
    /// unrecognized name.
    pub fn get(&self, name: &str) -> Option<String> {
        let v = match name {
            "t" | "temp" | "temperature" => format!("{:.3}", self.temperature),
            "p" | "top_p" => format!("{:.3}", self.top_p),
            "k" | "top_k" => format!("{}", self.top_k),
            "min_p" => format!("{:.3}", self.min_p),
            "pen_freq" | "frequency_penalty" => format!("{:.3}", self.frequency_penalty),
            "pen_pres" | "presence_penalty" => format!("{:.3}", self.presence_penalty),
            "pen_rep" | "repeat_penalty" => format!("{:.3}", self.repeat_penalty),
            _ => return None,
        };
        Some(v)
    }

    /// Set a single field from a string value. Invalid numeric text leaves
    /// the current value unchanged and returns `false` (spec.md §4.3,
    /// §7 ParseError policy); an unrecognized field name also returns
    /// `false` without touching anything.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match name {
            "t" | "temp" | "temperature" => parse_into(value, &mut self.temperature),
            "p" | "top_p" => parse_into(value, &mut self.top_p),
            "k" | "top_k" => parse_into(value, &mut self.top_k),
            "min_p" => parse_into(value, &mut self.min_p),
            "pen_freq" | "frequency_penalty" => parse_into(value, &mut self.frequency_penalty),
            "pen_pres" | "presence_penalty" => parse_into(value, &mut self.presence_penalty),
            "pen_rep" | "repeat_penalty" => parse_into(value, &mut self.repeat_penalty),
            _ => false,
        }
    }

    /// Canonical display name for a `/x` command token, used by `/?`.
    pub fn canonical_name(name: &str) -> Option<&'static str> {
        let n = match name {
            "t" | "temp" | "temperature" => "temp",
            "p" | "top_p" => "top_p",
            "k" | "top_k" => "top_k",
            "min_p" => "min_p",
            "pen_freq" | "frequency_penalty" => "pen_freq",
            "pen_pres" | "presence_penalty" => "pen_pres",
            "pen_rep" | "repeat_penalty" => "pen_rep",
            _ => return None,
        };
        Some(n)
    }
}

impl Default for SamplingProfile {
    fn default() -> Self {
        Self::rwkv_default()
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) -> bool {
    match value.trim().parse::<T>() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

/// JSON (de)serialization with defaults falling back to the RWKV preset for
/// any missing field (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileJson {
    #[serde(default = "default_temp")]
    temperature: f32,
    #[serde(default = "default_top_p")]
    top_p: f32,
    #[serde(default = "default_top_k")]
    top_k: u32,
    #[serde(default)]
    min_p: f32,
    #[serde(default = "default_freq")]
    frequency_penalty: f32,
    #[serde(default = "default_pres")]
    presence_penalty: f32,
    #[serde(default = "default_rep")]
    repeat_penalty: f32,
}

fn default_temp() -> f32 {
    SamplingProfile::rwkv_default().temperature
}
fn default_top_p() -> f32 {
    SamplingProfile::rwkv_default().top_p
}
fn default_top_k() -> u32 {
    SamplingProfile::rwkv_default().top_k
}
fn default_freq() -> f32 {
    SamplingProfile::rwkv_default().frequency_penalty
}
fn default_pres() -> f32 {
    SamplingProfile::rwkv_default().presence_penalty
}
fn default_rep() -> f32 {
    SamplingProfile::rwkv_default().repeat_penalty
}

impl From<ProfileJson> for SamplingProfile {
    fn from(j: ProfileJson) -> Self {
        Self {
            temperature: j.temperature,
            top_p: j.top_p,
            top_k: j.top_k,
            min_p: j.min_p,
            frequency_penalty: j.frequency_penalty,
            presence_penalty: j.presence_penalty,
            repeat_penalty: j.repeat_penalty,
        }
    }
}

impl From<SamplingProfile> for ProfileJson {
    fn from(p: SamplingProfile) -> Self {
        Self {
            temperature: p.temperature,
            top_p: p.top_p,
            top_k: p.top_k,
            min_p: p.min_p,
            frequency_penalty: p.frequency_penalty,
            presence_penalty: p.presence_penalty,
            repeat_penalty: p.repeat_penalty,
        }
    }
}

impl SamplingProfile {
    /// Serialize to the compact JSON representation (spec.md §6).
    pub fn to_json(self) -> kvd_domain::error::Result<String> {
        let j: ProfileJson = self.into();
        serde_json::to_string(&j).map_err(kvd_domain::error::Error::Json)
    }

    /// Parse from JSON text, falling back to RWKV defaults for any field
    /// the document omits.
    pub fn from_json(text: &str) -> kvd_domain::error::Result<Self> {
        let j: ProfileJson = serde_json::from_str(text).map_err(kvd_domain::error::Error::Json)?;
        Ok(j.into())
    }
}
