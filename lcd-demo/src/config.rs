use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use dotenv::var;
use lcd1602_gpio::lcd::hd44780::{Glyph, TimingConfig};
use serde::{Serialize, Deserialize};

/// A custom glyph and the character it stands for.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GlyphConfig {
    pub character: char,
    pub slot: u8,
    pub rows: Glyph,
}

/// Overrides for the controller timing, for slow or out-of-spec modules.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TimingOverrides {
    pub short_settle_us: Option<u64>,
    pub long_settle_us: Option<u64>,
    pub power_on_delay_ms: Option<u64>,
    pub busy_timeout_ms: Option<u64>,
}

impl TimingOverrides {
    pub fn apply(&self, mut timing: TimingConfig) -> TimingConfig {
        if let Some(us) = self.short_settle_us {
            timing.short_settle = Duration::from_micros(us);
        }
        if let Some(us) = self.long_settle_us {
            timing.long_settle = Duration::from_micros(us);
        }
        if let Some(ms) = self.power_on_delay_ms {
            timing.power_on_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.busy_timeout_ms {
            timing.busy_timeout = Duration::from_millis(ms);
        }
        timing
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Config {
    /// Text of both lines. `{host}`, `{os}`, `{kernel}` and `{arch}` are replaced with system info.
    pub lines: [String; 2],
    pub glyphs: Vec<GlyphConfig>,
    pub timing: Option<TimingOverrides>,
}

impl Config {
    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("lcd.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("CONFIG_FILE").unwrap_or_else(|_| "lcd.json".to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lines: ["\u{2665} {host}".to_string(), "{arch} {kernel}".to_string()],
            glyphs: vec![GlyphConfig {
                character: '\u{2665}',
                slot: 0,
                rows: [
                    0b00000, 0b01010, 0b11111, 0b11111, 0b11111, 0b01110, 0b00100, 0b00000,
                ],
            }],
            timing: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_is_set() {
        let overrides = TimingOverrides {
            busy_timeout_ms: Some(200),
            ..TimingOverrides::default()
        };
        let timing = overrides.apply(TimingConfig::default());
        assert_eq!(timing.busy_timeout, Duration::from_millis(200));
        assert_eq!(timing.short_settle, TimingConfig::default().short_settle);
    }

    #[test]
    fn default_config_survives_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.glyphs[0].character, '\u{2665}');
        assert!(config.timing.is_none());
    }
}
