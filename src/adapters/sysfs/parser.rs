use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::domain::InterfaceCounters;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// `IFF_UP` bit of the interface flags
const IFF_UP: u32 = 0x1;

/// Parse a single decimal counter file such as `statistics/tx_bytes`
pub fn parse_counter(field: &str, content: &str) -> ParseResult<u64> {
    content
        .trim()
        .parse::<u64>()
        .map_err(|e| ParseError::Parse(format!("{}: {}", field, e)))
}

/// Parse `/sys/class/net/{interface}/flags` (hex, e.g. `0x1003`)
pub fn parse_flags(content: &str) -> ParseResult<u32> {
    let value = content.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u32::from_str_radix(digits, 16).map_err(|e| ParseError::Parse(format!("flags {:?}: {}", value, e)))
}

pub fn flags_is_up(flags: u32) -> bool {
    flags & IFF_UP != 0
}

/// Parse `/sys/class/net/{interface}/operstate`
pub fn parse_operstate(content: &str) -> bool {
    content.trim() == "up"
}

/// Read sent/received byte totals from `/sys/class/net/{interface}/statistics`
pub fn parse_net_stats(stats_dir: &Path) -> ParseResult<InterfaceCounters> {
    let tx_bytes = parse_counter("tx_bytes", &fs::read_to_string(stats_dir.join("tx_bytes"))?)?;
    let rx_bytes = parse_counter("rx_bytes", &fs::read_to_string(stats_dir.join("rx_bytes"))?)?;

    Ok(InterfaceCounters::new(tx_bytes, rx_bytes))
}

/// Administrative state from `flags`, falling back to `operstate`
pub fn parse_is_up(interface_dir: &Path) -> ParseResult<bool> {
    match fs::read_to_string(interface_dir.join("flags")) {
        Ok(content) => Ok(flags_is_up(parse_flags(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let operstate = fs::read_to_string(interface_dir.join("operstate"))?;
            Ok(parse_operstate(&operstate))
        }
        Err(e) => Err(e.into()),
    }
}
