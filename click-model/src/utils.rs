use serde::Serialize;

use crate::Error;

/// Serializes the data with bincode, prefixed by the one byte schema version.
pub(crate) fn serialize_with_version(data: &impl Serialize, version: u8) -> Result<Vec<u8>, Error> {
    let size = bincode::serialized_size(data)? + 1;
    let mut serialized = Vec::with_capacity(size as usize);
    // version is encoded in the first byte
    serialized.push(version);
    bincode::serialize_into(&mut serialized, data)?;

    Ok(serialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_first_byte() {
        let serialized = serialize_with_version(&(1u32, 2u32), 7).unwrap();
        assert_eq!(serialized[0], 7);
        assert_eq!(
            bincode::deserialize::<(u32, u32)>(&serialized[1..]).unwrap(),
            (1, 2),
        );
    }
}
