//! Bitfield paging.

use bytes::Bytes;

use crate::error::{HyperError, Result};

/// Split a bitfield write into `(page_index, page)` pairs.
///
/// `offset` and `data.len()` must both be whole multiples of `page_size`.
pub fn split_pages(offset: u64, data: &Bytes, page_size: u16) -> Result<Vec<(u64, Bytes)>> {
    let misaligned = || HyperError::PageMisaligned {
        offset,
        len: data.len(),
        page_size,
    };

    let size = page_size as usize;
    if size == 0 || offset % page_size as u64 != 0 || data.len() % size != 0 {
        return Err(misaligned());
    }

    let first = offset / page_size as u64;
    Ok((0..data.len() / size)
        .map(|i| (first + i as u64, data.slice(i * size..(i + 1) * size)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_in_order() {
        let data = Bytes::from((0u8..8).collect::<Vec<_>>());
        let pages = split_pages(8, &data, 4).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], (2, Bytes::from_static(&[0, 1, 2, 3])));
        assert_eq!(pages[1], (3, Bytes::from_static(&[4, 5, 6, 7])));
    }

    #[test]
    fn test_misaligned_offset() {
        let data = Bytes::from(vec![0u8; 4]);
        let err = split_pages(2, &data, 4).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_misaligned_length() {
        let data = Bytes::from(vec![0u8; 6]);
        assert!(split_pages(0, &data, 4).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_empty_write_is_aligned() {
        let pages = split_pages(4, &Bytes::new(), 4).unwrap();
        assert!(pages.is_empty());
    }
}
