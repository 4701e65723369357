use log::{debug, info};
use thiserror::Error;

use gdslift_core::model::Library;
use gdslift_core::{Diagnostics, LayerTable};
use gdslift_extrude::extract::element_outline;
use gdslift_extrude::{extract_structure, extrude_all, ExtractOptions, LayerPolygon, Solid3d};
use gdslift_io::cursor::ByteOrder;
use gdslift_io::reader::{GdsReader, ParseError};

/// Handle-level failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandleError {
    #[error("invalid or stale handle {value}")]
    InvalidHandle { value: u32 },
    #[error("index {index} out of range ({len} available)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Handle(#[from] HandleError),
    #[error("registry full: all {capacity} slots in use")]
    RegistryFull { capacity: usize },
}

/// Opaque library handle. The raw value round-trips through hosts that
/// can only carry integers; zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }
}

struct Entry {
    data: Vec<u8>,
    order: ByteOrder,
    library: Library,
    diagnostics: Diagnostics,
}

impl Entry {
    /// Run pass 2 for one structure if it has not run yet.
    fn ensure_parsed(&mut self, index: usize) -> Result<(), ParseError> {
        if self.library.structures[index].parsed {
            return Ok(());
        }
        let mut reader = GdsReader::with_order(&self.data, self.order);
        reader.parse_structure(&mut self.library.structures[index])?;
        self.diagnostics.merge(reader.take_diagnostics());
        Ok(())
    }
}

struct Slot {
    /// Bumped on every free so a reissued slot invalidates old handles.
    generation: u32,
    entry: Option<Entry>,
}

const DEFAULT_CAPACITY: usize = 32;

/// Owns loaded libraries and maps them to integer handles.
///
/// Slots are a fixed-capacity table scanned linearly on load; the
/// capacity bounds how many libraries a host can hold open at once. A
/// freed slot's generation is bumped, so a handle that outlives its
/// library is rejected rather than silently resolving to a newer one.
///
/// Every failing call also stores its message for [`last_error`]
/// (Self::last_error), matching hosts that report errors out-of-band.
pub struct LibraryRegistry {
    slots: Vec<Slot>,
    last_error: Option<String>,
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|_| Slot {
                    generation: 0,
                    entry: None,
                })
                .collect(),
            last_error: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Message of the most recent failing call, cleared by the next
    /// successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn encode(&self, index: usize, generation: u32) -> Handle {
        Handle(generation * self.slots.len() as u32 + index as u32 + 1)
    }

    fn decode(&self, handle: Handle) -> Result<usize, HandleError> {
        let cap = self.slots.len() as u32;
        if handle.0 == 0 {
            return Err(HandleError::InvalidHandle { value: handle.0 });
        }
        let index = ((handle.0 - 1) % cap) as usize;
        let generation = (handle.0 - 1) / cap;
        let slot = &self.slots[index];
        if slot.generation != generation || slot.entry.is_none() {
            return Err(HandleError::InvalidHandle { value: handle.0 });
        }
        Ok(index)
    }

    fn record<T>(&mut self, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(err.to_string()),
        }
        result
    }

    /// Load a stream: detect byte order, run pass 1, and hand out a
    /// handle. The registry takes ownership of the buffer because pass 2
    /// reads from it later.
    pub fn load(&mut self, data: Vec<u8>) -> Result<Handle, BridgeError> {
        let result = self.try_load(data);
        self.record(result)
    }

    fn try_load(&mut self, data: Vec<u8>) -> Result<Handle, BridgeError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.entry.is_none())
            .ok_or(BridgeError::RegistryFull {
                capacity: self.slots.len(),
            })?;

        let mut reader = GdsReader::new(&data)?;
        let library = reader.read_library()?;
        let order = reader.byte_order();
        let diagnostics = reader.take_diagnostics();

        info!(
            "loaded library '{}' into slot {} ({} structures)",
            library.name,
            index,
            library.structure_count()
        );
        self.slots[index].entry = Some(Entry {
            data,
            order,
            library,
            diagnostics,
        });
        Ok(self.encode(index, self.slots[index].generation))
    }

    /// Drop a library and invalidate every handle to it.
    pub fn free_library(&mut self, handle: Handle) -> Result<(), BridgeError> {
        let result = (|| {
            let index = self.decode(handle)?;
            self.slots[index].entry = None;
            self.slots[index].generation += 1;
            debug!("freed slot {}", index);
            Ok(())
        })();
        self.record(result)
    }

    fn entry(&self, handle: Handle) -> Result<&Entry, HandleError> {
        let index = self.decode(handle)?;
        Ok(self.slots[index]
            .entry
            .as_ref()
            .expect("decode checked occupancy"))
    }

    fn entry_mut(&mut self, handle: Handle) -> Result<&mut Entry, HandleError> {
        let index = self.decode(handle)?;
        Ok(self.slots[index]
            .entry
            .as_mut()
            .expect("decode checked occupancy"))
    }

    fn structure_index(entry: &Entry, index: usize) -> Result<usize, HandleError> {
        let len = entry.library.structure_count();
        if index >= len {
            return Err(HandleError::IndexOutOfRange { index, len });
        }
        Ok(index)
    }

    pub fn library_name(&mut self, handle: Handle) -> Result<String, BridgeError> {
        let result = self
            .entry(handle)
            .map(|e| e.library.name.clone())
            .map_err(BridgeError::from);
        self.record(result)
    }

    pub fn structure_count(&mut self, handle: Handle) -> Result<usize, BridgeError> {
        let result = self
            .entry(handle)
            .map(|e| e.library.structure_count())
            .map_err(BridgeError::from);
        self.record(result)
    }

    pub fn structure_name(
        &mut self,
        handle: Handle,
        index: usize,
    ) -> Result<String, BridgeError> {
        let result = (|| -> Result<String, HandleError> {
            let entry = self.entry(handle)?;
            let index = Self::structure_index(entry, index)?;
            Ok(entry.library.structures[index].name.clone())
        })()
        .map_err(BridgeError::from);
        self.record(result)
    }

    /// Element count of one structure, parsing it on first use.
    pub fn element_count(&mut self, handle: Handle, index: usize) -> Result<usize, BridgeError> {
        let result = (|| {
            let entry = self.entry_mut(handle)?;
            let index = Self::structure_index(entry, index)?;
            entry.ensure_parsed(index)?;
            Ok(entry.library.structures[index].element_count())
        })();
        self.record(result)
    }

    /// Outline vertices of a single element, parsing its structure on
    /// first use. Elements without geometry (text, references, bad
    /// paths) yield an empty list rather than an error.
    pub fn element_polygon(
        &mut self,
        handle: Handle,
        structure_index: usize,
        element_index: usize,
    ) -> Result<Vec<(f64, f64)>, BridgeError> {
        let result = (|| {
            let entry = self.entry_mut(handle)?;
            let structure_index = Self::structure_index(entry, structure_index)?;
            entry.ensure_parsed(structure_index)?;
            let structure = &entry.library.structures[structure_index];
            if element_index >= structure.element_count() {
                return Err(BridgeError::Handle(HandleError::IndexOutOfRange {
                    index: element_index,
                    len: structure.element_count(),
                }));
            }
            let outline = element_outline(&structure.elements[element_index])
                .unwrap_or_default();
            Ok(outline.into_iter().map(|p| (p.x, p.y)).collect())
        })();
        self.record(result)
    }

    /// Extract the flat polygons of one structure, parsing it on first
    /// use. Recoverable extraction problems land in the library's
    /// accumulated [`Diagnostics`], not in the error channel.
    pub fn structure_polygons(
        &mut self,
        handle: Handle,
        index: usize,
        table: &LayerTable,
        options: &ExtractOptions,
    ) -> Result<Vec<LayerPolygon>, BridgeError> {
        let result = (|| {
            let entry = self.entry_mut(handle)?;
            let index = Self::structure_index(entry, index)?;
            entry.ensure_parsed(index)?;
            let (polygons, diag) =
                extract_structure(&entry.library.structures[index], table, options);
            entry.diagnostics.merge(diag);
            Ok(polygons)
        })();
        self.record(result)
    }

    /// Extract and extrude one structure into prisms.
    pub fn structure_solids(
        &mut self,
        handle: Handle,
        index: usize,
        table: &LayerTable,
        options: &ExtractOptions,
    ) -> Result<Vec<Solid3d>, BridgeError> {
        let polygons = self.structure_polygons(handle, index, table, options)?;
        let result = (|| {
            let entry = self.entry_mut(handle)?;
            let (solids, diag) = extrude_all(&polygons);
            entry.diagnostics.merge(diag);
            Ok(solids)
        })();
        self.record(result)
    }

    /// Snapshot of everything counted and skipped for this library so
    /// far, across parsing and extraction.
    pub fn diagnostics(&mut self, handle: Handle) -> Result<Diagnostics, BridgeError> {
        let result = self
            .entry(handle)
            .map(|e| e.diagnostics.clone())
            .map_err(BridgeError::from);
        self.record(result)
    }
}
