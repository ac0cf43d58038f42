mod config;

use std::env::var;
use dotenv::dotenv;
use lcd1602_gpio::GpioDriver;
use lcd1602_gpio::gpiod::GpiodDriver;
use lcd1602_gpio::i2c::LinuxI2cBus;
use lcd1602_gpio::lcd::hd44780::driver::{
    GpioHD44780Transport, HD44780Transport, I2cHD44780Transport,
};
use lcd1602_gpio::lcd::hd44780::{Lcd1602, TimingConfig};
use log::{debug, info, warn};
use sysinfo::System;
use crate::config::{Config, TimingOverrides};

const UNKNOWN_STR: &str = "???";

fn parse_pin_bus<const N: usize>(pin_str: &str) -> eyre::Result<[usize; N]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Expected {} data pins", N))
}

fn optional_pin(name: &str) -> eyre::Result<Option<usize>> {
    match var(name) {
        Ok(value) => Ok(Some(value.parse()?)),
        Err(_) => Ok(None),
    }
}

fn parse_address(address_str: &str) -> eyre::Result<u8> {
    let address = match address_str.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => address_str.parse()?,
    };
    Ok(address)
}

fn system_info(template: &str) -> String {
    template
        .replace("{host}", System::host_name().as_deref().unwrap_or(UNKNOWN_STR))
        .replace("{os}", System::name().as_deref().unwrap_or(UNKNOWN_STR))
        .replace("{kernel}", System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR))
        .replace("{arch}", &System::cpu_arch())
}

/// Builds the display with the configured timing instead of the defaults.
fn with_timing<T: HD44780Transport>(
    transport: T,
    overrides: &TimingOverrides,
) -> eyre::Result<Lcd1602<T>> {
    let timing = overrides.apply(TimingConfig::default());
    debug!("Using {:?}", timing);
    let mut lcd = Lcd1602::new(transport, timing);
    lcd.init()?;
    Ok(lcd)
}

fn show<T: HD44780Transport>(lcd: &mut Lcd1602<T>, config: &Config) -> eyre::Result<()> {
    for glyph in &config.glyphs {
        lcd.create_character(glyph.slot, &glyph.rows)?;
        lcd.map_character(glyph.character, glyph.slot)?;
    }

    for (line, template) in config.lines.iter().enumerate() {
        let text: String = system_info(template)
            .chars()
            .map(|c| if lcd.character_map().resolve(c).is_ok() { c } else { '?' })
            .collect();
        info!("Line {}: {}", line, text);
        lcd.write_text(0, line as u8, &text)?;
    }

    if lcd.capabilities().supports_read {
        let first = lcd.read_code(0, 0)?;
        debug!("Read back {:#04X} at (0, 0)", first);
    }
    info!("Cursor at {:?}", lcd.get_cursor_position());
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    let config = Config::try_load().unwrap_or_else(|| {
        let config = Config::default();
        if let Err(e) = config.save() {
            warn!("Could not write default config: {}", e);
        }
        config
    });
    debug!("{:?}", config);

    let bus = var("LCD_BUS").unwrap_or_else(|_| "i2c".to_string());
    match bus.as_str() {
        "i2c" => {
            let bus_id: u8 = var("LCD_I2C_BUS").map_or(Ok(1), |s| s.parse())?;
            let address = var("LCD_I2C_ADDR").ok().map(|s| parse_address(&s)).transpose()?;
            info!("LCD @ I2C bus {}, address {:02X?}", bus_id, address);

            let mut i2c = LinuxI2cBus::open(bus_id)?;
            let mut lcd = match &config.timing {
                Some(overrides) => {
                    with_timing(I2cHD44780Transport::new(&mut i2c, address), overrides)?
                }
                None => Lcd1602::begin_i2c(&mut i2c, address)?,
            };
            show(&mut lcd, &config)?;
        }
        "4bit" | "8bit" => {
            let chip = var("LCD_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
            let rs_pin_no: usize = var("LCD_PIN_RS")?.parse()?;
            let e_pin_no: usize = var("LCD_PIN_E")?.parse()?;
            let rw_pin_no = optional_pin("LCD_PIN_RW")?;
            let bl_pin_no = optional_pin("LCD_PIN_BL")?;
            let data_pins = var("LCD_PINS_DATA")?;

            info!(
                "LCD @ {} RS: {}, E: {}, RW: {:?}, BL: {:?}, Data: {}",
                chip, rs_pin_no, e_pin_no, rw_pin_no, bl_pin_no, data_pins
            );

            let gpio = GpiodDriver::open(&chip)?;
            debug!("{:?} initialized.", gpio);

            let mut rs_pin = gpio.get_pin(rs_pin_no)?;
            let rs_out = rs_pin.as_output()?;
            let mut e_pin = gpio.get_pin(e_pin_no)?;
            let e_out = e_pin.as_output()?;
            let mut rw_pin = rw_pin_no.map(|no| gpio.get_pin(no)).transpose()?;
            let rw_out = rw_pin.as_mut().map(|pin| pin.as_output()).transpose()?;
            let mut bl_pin = bl_pin_no.map(|no| gpio.get_pin(no)).transpose()?;
            let bl_out = bl_pin.as_mut().map(|pin| pin.as_output()).transpose()?;

            if bus == "4bit" {
                let mut data_bus = gpio.get_pin_bus(parse_pin_bus::<4>(&data_pins)?)?;
                let mut lcd = match &config.timing {
                    Some(overrides) => with_timing(
                        GpioHD44780Transport::new_4bit(
                            &*rs_out,
                            &*e_out,
                            &mut *data_bus,
                            rw_out.as_deref(),
                            bl_out.as_deref(),
                        ),
                        overrides,
                    )?,
                    None => Lcd1602::begin_4bit(
                        &*rs_out,
                        &*e_out,
                        &mut *data_bus,
                        rw_out.as_deref(),
                        bl_out.as_deref(),
                    )?,
                };
                show(&mut lcd, &config)?;
            } else {
                let mut data_bus = gpio.get_pin_bus(parse_pin_bus::<8>(&data_pins)?)?;
                let mut lcd = match &config.timing {
                    Some(overrides) => with_timing(
                        GpioHD44780Transport::new_8bit(
                            &*rs_out,
                            &*e_out,
                            &mut *data_bus,
                            rw_out.as_deref(),
                            bl_out.as_deref(),
                        ),
                        overrides,
                    )?,
                    None => Lcd1602::begin_8bit(
                        &*rs_out,
                        &*e_out,
                        &mut *data_bus,
                        rw_out.as_deref(),
                        bl_out.as_deref(),
                    )?,
                };
                show(&mut lcd, &config)?;
            }
        }
        other => eyre::bail!("Unknown LCD_BUS {:?}, expected 4bit, 8bit or i2c", other),
    }

    info!("Done.");
    Ok(())
}
