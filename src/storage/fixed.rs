//! Fixed-slot storage
//!
//! Every record occupies a slot of the same size, computed from the field
//! limits. A block holds `block_size / slot_size` slots; the remainder is
//! padding. Slot `s` of block `b` lives at `b * block_size + s * slot_size`.
//!
//! Deletion flips the slot's status byte. Tombstoned slots are not reused;
//! only a reorganization drops them.

use std::path::Path;

use crate::codec::{RecordStatus, SlotContent, SlotLayout, SLOT_STATUS_OFFSET};
use crate::config::StrategyKind;
use crate::error::{Result, StoreError};
use crate::record::{FieldLimits, Student};

use super::{BlockFile, BlockStats, Storage, StoreStats};

/// Uniform pre-sized record slots
#[derive(Debug, Clone)]
pub struct FixedStorage {
    block_size: usize,
    layout: SlotLayout,
    slots_per_block: usize,
}

impl FixedStorage {
    /// Create the strategy; a block must hold at least one slot
    pub fn new(block_size: usize, limits: FieldLimits) -> Result<Self> {
        let layout = SlotLayout::new(limits);
        check_block_size(block_size, &layout)?;
        let slots_per_block = block_size / layout.slot_size();
        Ok(Self {
            block_size,
            layout,
            slots_per_block,
        })
    }

    pub fn slot_size(&self) -> usize {
        self.layout.slot_size()
    }

    pub fn slots_per_block(&self) -> usize {
        self.slots_per_block
    }

    fn slot<'a>(&self, block: &'a [u8], slot: usize) -> &'a [u8] {
        let start = slot * self.slot_size();
        &block[start..start + self.slot_size()]
    }

    /// Find the active slot holding `key` as (block, slot)
    fn locate(&self, file: &mut BlockFile, key: u32) -> Result<(usize, usize)> {
        for item in file.blocks()? {
            let (block_index, block) = item?;
            for slot in 0..self.slots_per_block {
                let (slot_key, status) = self.layout.peek(self.slot(&block, slot))?;
                if slot_key == key && status == RecordStatus::Active {
                    return Ok((block_index, slot));
                }
            }
        }
        Err(StoreError::NotFound(key))
    }

    fn encode_all(&self, records: &[Student]) -> Result<Vec<Vec<u8>>> {
        records.iter().map(|r| self.layout.encode(r)).collect()
    }
}

impl Storage for FixedStorage {
    fn write_all(&self, path: &Path, records: &[Student]) -> Result<()> {
        let slots = self.encode_all(records)?;

        let mut file = BlockFile::create(path, self.block_size)?;
        let mut blocks = 0;
        for (index, chunk) in slots.chunks(self.slots_per_block).enumerate() {
            file.write_block(index, &chunk.concat())?;
            blocks += 1;
        }

        tracing::info!(
            records = records.len(),
            blocks,
            slot_size = self.slot_size(),
            slots_per_block = self.slots_per_block,
            "wrote {}",
            path.display()
        );
        Ok(())
    }

    fn find_by_key(&self, path: &Path, key: u32) -> Result<Student> {
        let mut file = BlockFile::open(path, self.block_size)?;
        let (block_index, slot) = self.locate(&mut file, key)?;

        let block = file.read_block(block_index)?;
        match self.layout.decode(self.slot(&block, slot))? {
            SlotContent::Record(student) => Ok(student),
            SlotContent::Empty | SlotContent::Tombstone => Err(StoreError::NotFound(key)),
        }
    }

    fn list_all(&self, path: &Path) -> Result<Vec<Student>> {
        let mut file = BlockFile::open(path, self.block_size)?;
        let mut students = Vec::new();

        for item in file.blocks()? {
            let (_, block) = item?;
            for slot in 0..self.slots_per_block {
                let content = self.layout.decode(self.slot(&block, slot))?;
                if let SlotContent::Record(student) = content {
                    students.push(student);
                }
            }
        }

        Ok(students)
    }

    fn add_many(&self, path: &Path, records: &[Student]) -> Result<()> {
        let slots = self.encode_all(records)?;

        let mut file = BlockFile::open_or_create(path, self.block_size)?;
        let mut block_count = file.block_count()?;
        let mut block = Vec::new();
        let mut loaded: Option<usize> = None;
        // Slots are only filled, never freed, so the search never moves back
        let mut next = 0usize;

        for (record, encoded) in records.iter().zip(&slots) {
            loop {
                let block_index = next / self.slots_per_block;
                let slot = next % self.slots_per_block;

                if block_index >= block_count {
                    file.write_block(block_count, encoded)?;
                    tracing::debug!(key = record.key, block = block_count, "appended new block");
                    block_count += 1;
                    loaded = None;
                    next = block_index * self.slots_per_block + 1;
                    break;
                }

                if loaded != Some(block_index) {
                    block = file.read_block(block_index)?;
                    loaded = Some(block_index);
                }
                let (slot_key, _) = self.layout.peek(self.slot(&block, slot))?;

                next += 1;
                if slot_key == 0 {
                    file.patch(block_index, slot * self.slot_size(), encoded)?;
                    tracing::debug!(
                        key = record.key,
                        block = block_index,
                        slot,
                        "filled empty slot"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    fn update(&self, path: &Path, record: &Student) -> Result<()> {
        let encoded = self.layout.encode(record)?;

        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let (block_index, slot) = self.locate(&mut file, record.key)?;

        // Slots never change size, so an update is always in place
        file.patch(block_index, slot * self.slot_size(), &encoded)?;
        tracing::debug!(key = record.key, block = block_index, slot, "updated slot");
        Ok(())
    }

    fn delete(&self, path: &Path, key: u32) -> Result<()> {
        let mut file = BlockFile::open_rw(path, self.block_size)?;
        let (block_index, slot) = self.locate(&mut file, key)?;

        file.patch(
            block_index,
            slot * self.slot_size() + SLOT_STATUS_OFFSET,
            &[RecordStatus::Deleted as u8],
        )?;
        tracing::debug!(key, block = block_index, slot, "tombstoned slot");
        Ok(())
    }

    fn stats(&self, path: &Path) -> Result<StoreStats> {
        let Some(mut file) = BlockFile::open_if_exists(path, self.block_size)? else {
            return Ok(StoreStats::empty());
        };

        let mut blocks = Vec::new();
        for item in file.blocks()? {
            let (index, block) = item?;
            let mut occupied = 0;
            let mut records = 0;

            for slot in 0..self.slots_per_block {
                match self.layout.decode(self.slot(&block, slot)) {
                    Ok(SlotContent::Empty) => {}
                    Ok(SlotContent::Tombstone) => occupied += 1,
                    Ok(SlotContent::Record(_)) => {
                        occupied += 1;
                        records += 1;
                    }
                    Err(e) => {
                        occupied += 1;
                        tracing::warn!(block = index, slot, "unreadable slot: {}", e);
                    }
                }
            }

            blocks.push(BlockStats::new(
                index,
                occupied * self.slot_size(),
                self.block_size,
                records,
            ));
        }

        Ok(StoreStats::from_blocks(self.block_size, blocks))
    }

    fn validate_block_size(&self, block_size: usize) -> Result<()> {
        check_block_size(block_size, &self.layout)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fixed
    }
}

fn check_block_size(block_size: usize, layout: &SlotLayout) -> Result<()> {
    if block_size < layout.slot_size() {
        return Err(StoreError::Config(format!(
            "block size of {} bytes is smaller than the {}-byte fixed slot",
            block_size,
            layout.slot_size()
        )));
    }
    Ok(())
}
