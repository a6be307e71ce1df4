use crate::error::ConfigurationError;
use crate::relay_state::RelayState;
use crate::relay_state::PORT_COUNT;

pub fn parse_address(value: &str) -> Result<u8, ConfigurationError> {
    match value.trim().parse::<u8>() {
        Ok(0) | Err(_) => Err(ConfigurationError::InvalidAddress(value.to_string())),
        Ok(address) => Ok(address),
    }
}

/// Parses `"<address>;<binary>"`, e.g. `"1;00110001"` for relays K1, K5 and K6
/// of the first card. The binary part is written most significant bit first.
pub fn parse_state_mask(mask: &str) -> Result<RelayState, ConfigurationError> {
    let (address, bits) = match mask.split_once(';') {
        Some(parts) => parts,
        None => {
            return Err(ConfigurationError::malformed_mask(
                mask,
                "expected '<address>;<binary>'",
            ))
        }
    };

    let address = parse_address(address)?;

    let bits = bits.trim();
    if bits.is_empty() || bits.len() > PORT_COUNT {
        return Err(ConfigurationError::malformed_mask(
            mask,
            format!("expected 1 to {} binary digits", PORT_COUNT),
        ));
    }
    if !bits.chars().all(|c| c == '0' || c == '1') {
        return Err(ConfigurationError::malformed_mask(
            mask,
            "binary part may only contain '0' and '1'",
        ));
    }

    let byte = match u8::from_str_radix(bits, 2) {
        Ok(byte) => byte,
        Err(e) => return Err(ConfigurationError::malformed_mask(mask, e.to_string())),
    };

    Ok(RelayState::from_byte(address, byte))
}
