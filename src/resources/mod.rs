//! Resource directory tree.
//!
//! The resource directory is a tree of `IMAGE_RESOURCE_DIRECTORY` headers, each followed by an
//! array of 8-byte entries. By convention the tree has three levels (type, name, language) but
//! nothing in the format enforces that, so the walk does not assume a depth.
//!
//! Every offset stored in the tree, whether it locates a subdirectory, a data entry or a name
//! string, is relative to the root of the resource directory and not to the directory that holds
//! it. The top bit of an entry's name field selects a UTF-16 name over a numeric id; the top bit
//! of its offset field selects a subdirectory over a data entry.
//!
//! Offsets come straight from the file, so a crafted image can make a directory reference itself
//! or an ancestor. The walk keeps the set of directory offsets it already decoded and skips any
//! entry that would revisit one, and it refuses to nest deeper than a caller supplied limit.
//!
//! # Example
//!
//! ```rust,no_run
//! use pescope::{File, resources::{ResourceTree, ResourceType}};
//!
//! let file = File::from_file(std::path::Path::new("app.exe"))?;
//! if let Some(tree) = ResourceTree::read(&file, 32)? {
//!     let package = tree
//!         .root
//!         .find_id(ResourceType::RcData as u32)
//!         .and_then(|node| node.as_directory())
//!         .and_then(|rcdata| rcdata.find_name("PACKAGEINFO"));
//!     println!("PACKAGEINFO present: {}", package.is_some());
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

use std::{collections::HashSet, fmt};

use strum::{Display, EnumIter, FromRepr};

use crate::{file::File, pe::DataDirectoryType, Error, Result};

/// Top bit of an entry's name or offset field.
const HIGH_BIT: u32 = 0x8000_0000;

/// Well-known resource type ids used at the first level of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u32)]
pub enum ResourceType {
    /// `RT_CURSOR`
    #[strum(serialize = "CURSORS")]
    Cursor = 1,
    /// `RT_BITMAP`
    #[strum(serialize = "BITMAPS")]
    Bitmap = 2,
    /// `RT_ICON`
    #[strum(serialize = "ICONS")]
    Icon = 3,
    /// `RT_MENU`
    #[strum(serialize = "MENUS")]
    Menu = 4,
    /// `RT_DIALOG`
    #[strum(serialize = "DIALOGS")]
    Dialog = 5,
    /// `RT_STRING`
    #[strum(serialize = "STRING_TABLES")]
    StringTable = 6,
    /// `RT_FONTDIR`
    #[strum(serialize = "FONT_DIRECTORY")]
    FontDirectory = 7,
    /// `RT_FONT`
    #[strum(serialize = "FONTS")]
    Font = 8,
    /// `RT_ACCELERATOR`
    #[strum(serialize = "ACCELERATORS")]
    Accelerator = 9,
    /// `RT_RCDATA`, raw application data
    #[strum(serialize = "RCDATA")]
    RcData = 10,
    /// `RT_MESSAGETABLE`
    #[strum(serialize = "MESSAGE_TABLES")]
    MessageTable = 11,
    /// `RT_GROUP_CURSOR`
    #[strum(serialize = "CURSOR_GROUPS")]
    CursorGroup = 12,
    /// `RT_GROUP_ICON`
    #[strum(serialize = "ICON_GROUPS")]
    IconGroup = 14,
    /// `RT_VERSION`
    #[strum(serialize = "VERSION_INFO")]
    VersionInfo = 16,
    /// `RT_HTML`
    #[strum(serialize = "HTML_PAGES")]
    HtmlPage = 23,
    /// `RT_MANIFEST`
    #[strum(serialize = "CONFIGURATION_FILES")]
    ConfigurationFile = 24,
}

/// How a directory entry is keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Numeric id
    Id(u32),
    /// UTF-16 name
    Name(String),
}

impl ResourceKey {
    /// The well-known type this id denotes, when it is one.
    ///
    /// Only meaningful for entries of the root directory.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        match self {
            ResourceKey::Id(id) => ResourceType::from_repr(*id),
            ResourceKey::Name(_) => None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Name(name) => f.write_str(name),
            ResourceKey::Id(id) => match ResourceType::from_repr(*id) {
                Some(kind) => write!(f, "{kind}"),
                None => write!(f, "#{id}"),
            },
        }
    }
}

/// A leaf of the tree: the location of one resource's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceData {
    /// RVA of the resource bytes
    pub rva: u32,
    /// Size of the resource in bytes
    pub size: u32,
    /// Code page used to decode code point values within the data
    pub code_page: u32,
    /// File offset of the bytes, `None` when the RVA does not translate
    pub offset: Option<usize>,
}

impl ResourceData {
    /// The raw resource bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the RVA does not translate, or
    /// [`crate::Error::OutOfBounds`] if the extent runs past the file.
    pub fn bytes<'a>(&self, file: &'a File) -> Result<&'a [u8]> {
        file.read_at_rva(self.rva, self.size as usize)
    }
}

/// Target of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceNode {
    /// A nested directory
    Directory(ResourceDirectory),
    /// A data entry
    Leaf(ResourceData),
}

impl ResourceNode {
    /// The nested directory, if this node is one.
    #[must_use]
    pub fn as_directory(&self) -> Option<&ResourceDirectory> {
        match self {
            ResourceNode::Directory(directory) => Some(directory),
            ResourceNode::Leaf(_) => None,
        }
    }

    /// The data entry, if this node is one.
    #[must_use]
    pub fn as_leaf(&self) -> Option<&ResourceData> {
        match self {
            ResourceNode::Leaf(data) => Some(data),
            ResourceNode::Directory(_) => None,
        }
    }

    /// The first data entry reached by always descending into the first child.
    ///
    /// This skips the language level when any language will do.
    #[must_use]
    pub fn first_leaf(&self) -> Option<&ResourceData> {
        let mut node = self;
        loop {
            match node {
                ResourceNode::Leaf(data) => return Some(data),
                ResourceNode::Directory(directory) => node = &directory.entries.first()?.node,
            }
        }
    }
}

/// One keyed child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Name or id of the entry
    pub key: ResourceKey,
    /// Subdirectory or data entry
    pub node: ResourceNode,
}

/// One `IMAGE_RESOURCE_DIRECTORY` and its decoded children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDirectory {
    /// Resource flags, reserved
    pub characteristics: u32,
    /// Creation time
    pub time_date_stamp: u32,
    /// Major version, set by the user
    pub major_version: u16,
    /// Minor version, set by the user
    pub minor_version: u16,
    /// Children in on-disk order: named entries first, then id entries
    pub entries: Vec<ResourceEntry>,
}

impl ResourceDirectory {
    /// Size of the directory header.
    pub const SIZE: u32 = 16;
    /// Size of one directory entry.
    pub const ENTRY_SIZE: u32 = 8;

    /// Look up a child by key.
    ///
    /// Names compare ASCII case-insensitively, as the Windows resource loader does.
    #[must_use]
    pub fn find(&self, key: &ResourceKey) -> Option<&ResourceNode> {
        match key {
            ResourceKey::Id(id) => self.find_id(*id),
            ResourceKey::Name(name) => self.find_name(name),
        }
    }

    /// Look up a child by numeric id.
    #[must_use]
    pub fn find_id(&self, id: u32) -> Option<&ResourceNode> {
        self.entries
            .iter()
            .find(|entry| entry.key == ResourceKey::Id(id))
            .map(|entry| &entry.node)
    }

    /// Look up a child by name.
    #[must_use]
    pub fn find_name(&self, name: &str) -> Option<&ResourceNode> {
        self.entries
            .iter()
            .find(|entry| matches!(&entry.key, ResourceKey::Name(key) if key.eq_ignore_ascii_case(name)))
            .map(|entry| &entry.node)
    }
}

/// The decoded resource directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTree {
    /// RVA of the root directory; every offset in the tree is relative to it
    pub root_rva: u32,
    /// The root directory, keyed by resource type
    pub root: ResourceDirectory,
}

impl ResourceTree {
    /// Decode the resource directory of `file`, nesting at most `max_depth` directories below
    /// the root.
    ///
    /// Returns `Ok(None)` if the image has no resource directory. Entries whose name, data entry
    /// or subdirectory do not translate are logged and left out.
    ///
    /// Every subdirectory is decoded at most once per walk, which bounds the work on hostile
    /// trees. A subdirectory shared by two entries therefore appears only under the first one;
    /// later entries pointing at it, cycles included, are logged and left out.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the root does not translate,
    /// [`crate::Error::OutOfBounds`] if the root is truncated, or
    /// [`crate::Error::RecursionLimit`] if the tree nests deeper than `max_depth`.
    pub fn read(file: &File, max_depth: usize) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::Resource) else {
            return Ok(None);
        };

        let mut walker = Walker {
            file,
            root_rva: directory.virtual_address,
            max_depth,
            visited: HashSet::new(),
        };
        walker.visited.insert(0);
        let root = walker.directory(0, 0)?;

        Ok(Some(ResourceTree {
            root_rva: directory.virtual_address,
            root,
        }))
    }

    /// Look up a node by following `path` from the root.
    #[must_use]
    pub fn find_path(&self, path: &[ResourceKey]) -> Option<&ResourceNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.find(first)?;
        for key in rest {
            node = node.as_directory()?.find(key)?;
        }
        Some(node)
    }

    /// Number of data entries in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        fn count(directory: &ResourceDirectory) -> usize {
            directory
                .entries
                .iter()
                .map(|entry| match &entry.node {
                    ResourceNode::Leaf(_) => 1,
                    ResourceNode::Directory(nested) => count(nested),
                })
                .sum()
        }

        count(&self.root)
    }
}

struct Walker<'a> {
    file: &'a File,
    root_rva: u32,
    max_depth: usize,
    visited: HashSet<u32>,
}

impl Walker<'_> {
    fn rva(&self, offset: u32) -> Result<u32> {
        self.root_rva
            .checked_add(offset)
            .ok_or(Error::UnmappedAddress(u64::from(self.root_rva) + u64::from(offset)))
    }

    fn directory(&mut self, offset: u32, depth: usize) -> Result<ResourceDirectory> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }

        let mut parser = self.file.parser_at_rva(self.rva(offset)?)?;
        let characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u16>()?;
        let minor_version = parser.read_le::<u16>()?;
        let named = parser.read_le::<u16>()?;
        let ids = parser.read_le::<u16>()?;

        let count = usize::from(named) + usize::from(ids);
        let mut raw_entries = Vec::with_capacity(count.min(parser.remaining() / 8));
        for _ in 0..count {
            raw_entries.push((parser.read_le::<u32>()?, parser.read_le::<u32>()?));
        }

        let mut entries = Vec::with_capacity(raw_entries.len());
        for (name, target) in raw_entries {
            match self.entry(name, target, depth) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(error @ Error::RecursionLimit(_)) => return Err(error),
                Err(error) => log::warn!(
                    "Skipping resource entry at root+0x{:X}: {}",
                    offset,
                    error
                ),
            }
        }

        Ok(ResourceDirectory {
            characteristics,
            time_date_stamp,
            major_version,
            minor_version,
            entries,
        })
    }

    fn entry(&mut self, name: u32, target: u32, depth: usize) -> Result<Option<ResourceEntry>> {
        let key = if name & HIGH_BIT != 0 {
            let mut parser = self.file.parser_at_rva(self.rva(name & !HIGH_BIT)?)?;
            ResourceKey::Name(parser.read_prefixed_string_utf16()?)
        } else {
            ResourceKey::Id(name)
        };

        let offset = target & !HIGH_BIT;
        let node = if target & HIGH_BIT != 0 {
            if !self.visited.insert(offset) {
                log::warn!(
                    "Resource entry {} revisits directory at root+0x{:X}, skipped",
                    key,
                    offset
                );
                return Ok(None);
            }
            ResourceNode::Directory(self.directory(offset, depth + 1)?)
        } else {
            ResourceNode::Leaf(self.data(offset)?)
        };

        Ok(Some(ResourceEntry { key, node }))
    }

    fn data(&self, offset: u32) -> Result<ResourceData> {
        let mut parser = self.file.parser_at_rva(self.rva(offset)?)?;
        let rva = parser.read_le::<u32>()?;
        let size = parser.read_le::<u32>()?;
        let code_page = parser.read_le::<u32>()?;

        Ok(ResourceData {
            rva,
            size,
            code_page,
            offset: self.file.rva_to_offset(rva).ok(),
        })
    }
}
