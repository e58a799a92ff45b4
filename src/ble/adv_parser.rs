//! Advertising data parsing for finding the slave half.
//!
//! Advertising data is a sequence of `[len, type, payload...]` structures
//! where `len` counts the type byte plus the payload.

use heapless::String;

const AD_INCOMPLETE_UUID128: u8 = 0x06;
const AD_COMPLETE_UUID128: u8 = 0x07;
const AD_SHORT_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;

/// Iterate `(type, payload)` pairs, stopping at the first malformed entry.
fn ad_structures<'a>(data: &'a [u8]) -> impl Iterator<Item = (u8, &'a [u8])> + 'a {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + 1 + len > data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Check whether advertising data lists the 128-bit service `uuid_le`
/// (little-endian, as on air).
pub fn contains_service_uuid128(data: &[u8], uuid_le: &[u8; 16]) -> bool {
    ad_structures(data)
        .filter(|(ad_type, _)| matches!(*ad_type, AD_INCOMPLETE_UUID128 | AD_COMPLETE_UUID128))
        .any(|(_, payload)| payload.chunks_exact(16).any(|chunk| chunk == uuid_le))
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let mut name = String::new();
    match ad_structures(data)
        .find(|(ad_type, _)| matches!(*ad_type, AD_SHORT_NAME | AD_COMPLETE_NAME))
    {
        Some((_, bytes)) => {
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LINK_SERVICE_UUID_LE;

    fn adv_with_uuid(ad_type: u8) -> heapless::Vec<u8, 31> {
        let mut data = heapless::Vec::new();
        data.extend_from_slice(&[0x02, 0x01, 0x06]).unwrap();
        data.extend_from_slice(&[17, ad_type]).unwrap();
        data.extend_from_slice(&LINK_SERVICE_UUID_LE).unwrap();
        data
    }

    #[test]
    fn finds_link_service_in_complete_list() {
        let data = adv_with_uuid(AD_COMPLETE_UUID128);
        assert!(contains_service_uuid128(&data, &LINK_SERVICE_UUID_LE));
    }

    #[test]
    fn finds_link_service_in_incomplete_list() {
        let data = adv_with_uuid(AD_INCOMPLETE_UUID128);
        assert!(contains_service_uuid128(&data, &LINK_SERVICE_UUID_LE));
    }

    #[test]
    fn other_uuid_does_not_match() {
        let mut other = LINK_SERVICE_UUID_LE;
        other[0] ^= 0xFF;
        let data = adv_with_uuid(AD_COMPLETE_UUID128);
        assert!(!contains_service_uuid128(&data, &other));
    }

    #[test]
    fn uuid_in_wrong_field_is_ignored() {
        // Same bytes carried as manufacturer data.
        let data = adv_with_uuid(0xFF);
        assert!(!contains_service_uuid128(&data, &LINK_SERVICE_UUID_LE));
    }

    #[test]
    fn truncated_structure_stops_parsing() {
        let data = adv_with_uuid(AD_COMPLETE_UUID128);
        assert!(!contains_service_uuid128(&data[..data.len() - 1], &LINK_SERVICE_UUID_LE));
        assert!(!contains_service_uuid128(&[], &LINK_SERVICE_UUID_LE));
    }

    #[test]
    fn device_name_extracted() {
        let data = [0x02, 0x01, 0x06, 0x05, 0x09, b'R', b'i', b'g', b'h'];
        assert_eq!(extract_device_name(&data).as_str(), "Righ");
    }

    #[test]
    fn missing_name_is_unknown() {
        let data = [0x02, 0x01, 0x06];
        assert_eq!(extract_device_name(&data).as_str(), "Unknown");
    }
}
