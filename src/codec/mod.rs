//! Codec Module
//!
//! Binary encoding of student records.
//!
//! ## Formats
//! - `frame`: self-describing variable-length frames used by the contiguous
//!   and fragmented strategies
//! - `slot`: fixed-size padded slots used by the fixed strategy
//!
//! Both read through `Cursor`, which fails with `StoreError::Format` instead
//! of reading past the end of a buffer.

mod cursor;
mod frame;
mod slot;

pub use cursor::Cursor;
pub use frame::{
    chain_end, chain_end_from, decode_frame, decode_payload, encode_frame, frame_len,
    is_sentinel, Decoded, FrameChain, FrameRef, RecordStatus, FRAME_HEAD_LEN, LEN_PREFIX,
    MIN_FRAME_LEN, STATUS_OFFSET,
};
pub use slot::{SlotContent, SlotLayout, SLOT_STATUS_OFFSET};
