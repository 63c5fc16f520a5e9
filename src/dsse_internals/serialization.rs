use super::error::DsseError;

const LEN_PREFIX_BYTE_LEN: usize = std::mem::size_of::<u32>();

/// Encodes a list of strings as `count (u32 LE) ‖ (len (u32 LE) ‖ utf8 bytes)*`.
///
/// Fails if the count, or the byte length of some entry, doesn't fit in its `u32` prefix.
pub fn encode_string_list<S: AsRef<str>>(items: &[S]) -> Result<Vec<u8>, DsseError> {
    let total_byte_len = LEN_PREFIX_BYTE_LEN + items.iter().map(|item| LEN_PREFIX_BYTE_LEN + item.as_ref().len()).sum::<usize>();

    let mut bytes = Vec::with_capacity(total_byte_len);
    bytes.extend_from_slice(&length_prefix(items.len())?);

    for item in items {
        let item = item.as_ref().as_bytes();
        bytes.extend_from_slice(&length_prefix(item.len())?);
        bytes.extend_from_slice(item);
    }

    Ok(bytes)
}

pub fn decode_string_list(bytes: &[u8]) -> Result<Vec<String>, DsseError> {
    let mut cursor = bytes;

    let count = read_u32_le(&mut cursor)? as usize;
    // Each entry needs at least its length prefix, which bounds what a corrupt count can make us allocate.
    if count > cursor.len() / LEN_PREFIX_BYTE_LEN {
        return Err(DsseError::FailedToDeserializeRankDirectory(format!("{} entries can't fit in {} bytes", count, cursor.len())));
    }

    let mut items = Vec::with_capacity(count);
    for idx in 0..count {
        let item_len = read_u32_le(&mut cursor)? as usize;
        if item_len > cursor.len() {
            return Err(DsseError::FailedToDeserializeRankDirectory(format!("entry {} is truncated", idx)));
        }

        let (item, rest) = cursor.split_at(item_len);
        let item = String::from_utf8(item.to_vec()).map_err(|err| DsseError::FailedToDeserializeRankDirectory(format!("entry {}: {}", idx, err)))?;

        items.push(item);
        cursor = rest;
    }

    if !cursor.is_empty() {
        return Err(DsseError::FailedToDeserializeRankDirectory(format!("{} trailing bytes", cursor.len())));
    }

    Ok(items)
}

#[inline(always)]
fn length_prefix(len: usize) -> Result<[u8; LEN_PREFIX_BYTE_LEN], DsseError> {
    u32::try_from(len).map(u32::to_le_bytes).map_err(|_| DsseError::RankDirectoryTooLarge(len))
}

#[inline(always)]
fn read_u32_le(cursor: &mut &[u8]) -> Result<u32, DsseError> {
    if cursor.len() < LEN_PREFIX_BYTE_LEN {
        return Err(DsseError::FailedToDeserializeRankDirectory(String::from("unexpected end of input")));
    }

    let (word, rest) = cursor.split_at(LEN_PREFIX_BYTE_LEN);
    *cursor = rest;

    let mut word_bytes = [0u8; LEN_PREFIX_BYTE_LEN];
    word_bytes.copy_from_slice(word);

    Ok(u32::from_le_bytes(word_bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test]
    fn string_list_survives_encoding() {
        let items = ["ID3", "ID7", "", "dокумент-2"];
        assert_eq!(decode_string_list(&encode_string_list(&items).unwrap()), Ok(items.map(String::from).to_vec()));
    }

    #[test_case(0 => Ok([0, 0, 0, 0]); "Zero length")]
    #[test_case(u32::MAX as usize => Ok([0xff, 0xff, 0xff, 0xff]); "Widest length fitting the prefix")]
    fn length_prefix_is_checked(len: usize) -> Result<[u8; LEN_PREFIX_BYTE_LEN], DsseError> {
        length_prefix(len)
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn length_wider_than_prefix_is_rejected() {
        let len = u32::MAX as usize + 1;
        assert_eq!(length_prefix(len), Err(DsseError::RankDirectoryTooLarge(len)));
    }

    #[test_case(&[] ; "Empty input")]
    #[test_case(&[1, 0, 0] ; "Truncated count")]
    #[test_case(&[1, 0, 0, 0, 5, 0, 0, 0, b'a'] ; "Truncated entry")]
    #[test_case(&[200, 0, 0, 0] ; "Count larger than input")]
    #[test_case(&[1, 0, 0, 0, 1, 0, 0, 0, 0xff] ; "Entry is not utf8")]
    #[test_case(&[0, 0, 0, 0, 0] ; "Trailing bytes")]
    fn malformed_string_list_is_rejected(bytes: &[u8]) {
        assert!(matches!(decode_string_list(bytes), Err(DsseError::FailedToDeserializeRankDirectory(_))));
    }
}
