//! On-disk layout for the index file's metadata page and its empty-page
//! freelist stack.

use common::{DbError, DbResult};

pub const INDEX_META_CANARY: u16 = 0xDADA;
pub const EMPTY_INDEX_PAGE_CANARY: u16 = 0xDCDC;

pub const NULL_NODE: i32 = -1;

mod offset {
    pub const HEAD_CANARY: usize = 0;
    pub const NUM_NODE: usize = HEAD_CANARY + 2;
    pub const NUM_ENTRY: usize = NUM_NODE + 4;
    pub const FIRST_FREE_PAGE: usize = NUM_ENTRY + 4;
    pub const ROOT_NODE: usize = FIRST_FREE_PAGE + 4;
    pub const TAIL_CANARY: usize = ROOT_NODE + 4;
    pub const END: usize = TAIL_CANARY + 2;
}

/// Page 0 of an index file.
#[derive(Clone, Copy, Debug)]
pub struct IndexMeta {
    pub num_node: i32,
    pub num_entry: i32,
    pub first_free_page: i32,
    pub root_node: i32,
}

impl IndexMeta {
    pub fn encode(&self, buf: &mut [u8]) {
        use offset::*;
        buf[..END].fill(0);
        buf[HEAD_CANARY..HEAD_CANARY + 2].copy_from_slice(&INDEX_META_CANARY.to_le_bytes());
        buf[NUM_NODE..NUM_NODE + 4].copy_from_slice(&self.num_node.to_le_bytes());
        buf[NUM_ENTRY..NUM_ENTRY + 4].copy_from_slice(&self.num_entry.to_le_bytes());
        buf[FIRST_FREE_PAGE..FIRST_FREE_PAGE + 4]
            .copy_from_slice(&self.first_free_page.to_le_bytes());
        buf[ROOT_NODE..ROOT_NODE + 4].copy_from_slice(&self.root_node.to_le_bytes());
        buf[TAIL_CANARY..TAIL_CANARY + 2].copy_from_slice(&INDEX_META_CANARY.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> DbResult<IndexMeta> {
        use offset::*;
        let head = u16::from_le_bytes(buf[HEAD_CANARY..HEAD_CANARY + 2].try_into().unwrap());
        let tail = u16::from_le_bytes(buf[TAIL_CANARY..TAIL_CANARY + 2].try_into().unwrap());
        if head != INDEX_META_CANARY || tail != INDEX_META_CANARY {
            return Err(DbError::ReadFailed);
        }
        Ok(IndexMeta {
            num_node: i32::from_le_bytes(buf[NUM_NODE..NUM_NODE + 4].try_into().unwrap()),
            num_entry: i32::from_le_bytes(buf[NUM_ENTRY..NUM_ENTRY + 4].try_into().unwrap()),
            first_free_page: i32::from_le_bytes(
                buf[FIRST_FREE_PAGE..FIRST_FREE_PAGE + 4].try_into().unwrap(),
            ),
            root_node: i32::from_le_bytes(buf[ROOT_NODE..ROOT_NODE + 4].try_into().unwrap()),
        })
    }
}

mod empty_offset {
    pub const HEAD_CANARY: usize = 0;
    pub const NEXT_PAGE: usize = HEAD_CANARY + 2;
    pub const TAIL_CANARY: usize = NEXT_PAGE + 4;
    pub const END: usize = TAIL_CANARY + 2;
}

/// A freed node page: just a canary-wrapped link to the next freed page.
#[derive(Clone, Copy, Debug)]
pub struct EmptyPageMeta {
    pub next_page: i32,
}

impl EmptyPageMeta {
    pub fn encode(&self, buf: &mut [u8]) {
        use empty_offset::*;
        buf[..END].fill(0);
        buf[HEAD_CANARY..HEAD_CANARY + 2]
            .copy_from_slice(&EMPTY_INDEX_PAGE_CANARY.to_le_bytes());
        buf[NEXT_PAGE..NEXT_PAGE + 4].copy_from_slice(&self.next_page.to_le_bytes());
        buf[TAIL_CANARY..TAIL_CANARY + 2]
            .copy_from_slice(&EMPTY_INDEX_PAGE_CANARY.to_le_bytes());
    }

    /// `None` if the page's canaries don't match, i.e. it holds a live node
    /// rather than an empty-page marker.
    pub fn decode(buf: &[u8]) -> Option<EmptyPageMeta> {
        use empty_offset::*;
        let head = u16::from_le_bytes(buf[HEAD_CANARY..HEAD_CANARY + 2].try_into().unwrap());
        let tail = u16::from_le_bytes(buf[TAIL_CANARY..TAIL_CANARY + 2].try_into().unwrap());
        if head != EMPTY_INDEX_PAGE_CANARY || tail != EMPTY_INDEX_PAGE_CANARY {
            return None;
        }
        let next_page = i32::from_le_bytes(buf[NEXT_PAGE..NEXT_PAGE + 4].try_into().unwrap());
        Some(EmptyPageMeta { next_page })
    }
}
