use crate::{
    object::{ObjectType, WrappedObject},
    AmlError,
};
use alloc::{
    collections::btree_map::BTreeMap,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::{fmt, str, str::FromStr};
use log::trace;

/// A handle to a node of the namespace. Handles are never reused, so a handle to a node that has
/// since been removed is detectably stale, rather than silently referring to a different object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Handle(u32);

#[derive(Clone, Debug)]
pub struct Node {
    pub path: AmlName,
    pub object: WrappedObject,
}

#[derive(Clone, Debug)]
pub struct Namespace {
    /// Running count of handles. Incremented every time a node is added, and never decremented.
    next_handle: u32,
    nodes: BTreeMap<Handle, Node>,
    paths: BTreeMap<AmlName, Handle>,
}

impl Namespace {
    pub fn new() -> Namespace {
        Namespace { next_handle: 0, nodes: BTreeMap::new(), paths: BTreeMap::new() }
    }

    /// Add an object to the namespace at the given absolute path, returning the handle of its
    /// node. If a node already exists at the path, its object is replaced and its handle is kept.
    pub fn insert(&mut self, path: AmlName, object: WrappedObject) -> Result<Handle, AmlError> {
        if !path.is_absolute() {
            return Err(AmlError::NameNotAbsolute(path));
        }
        let path = path.normalize()?;
        if path == AmlName::root() {
            return Err(AmlError::InvalidNormalizedName(path));
        }

        if let Some(&handle) = self.paths.get(&path) {
            /*
             * Real AML often has name collisions, and so we can't afford to be too strict about
             * it.
             */
            trace!("AML name collision: {}. Replacing object.", path);
            if let Some(node) = self.nodes.get_mut(&handle) {
                node.object = object;
            }
            return Ok(handle);
        }

        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.paths.insert(path.clone(), handle);
        self.nodes.insert(handle, Node { path, object });
        Ok(handle)
    }

    pub fn remove(&mut self, handle: Handle) -> Result<WrappedObject, AmlError> {
        let node = self.nodes.remove(&handle).ok_or(AmlError::InvalidHandle(handle))?;
        self.paths.remove(&node.path);
        Ok(node.object)
    }

    pub fn get(&self, handle: Handle) -> Result<&WrappedObject, AmlError> {
        self.nodes.get(&handle).map(|node| &node.object).ok_or(AmlError::InvalidHandle(handle))
    }

    /// The type of the object attached to a node, or `None` if the handle is stale.
    pub fn node_type(&self, handle: Handle) -> Option<ObjectType> {
        self.nodes.get(&handle).map(|node| node.object.typ())
    }

    pub fn get_handle(&self, path: &AmlName) -> Result<Handle, AmlError> {
        let path = path.clone().normalize()?;
        self.paths.get(&path).copied().ok_or(AmlError::ObjectDoesNotExist(path))
    }

    pub fn get_by_path(&self, path: &AmlName) -> Result<&WrappedObject, AmlError> {
        let handle = self.get_handle(path)?;
        self.get(handle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::new()
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct AmlName(Vec<NameComponent>);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum NameComponent {
    Root,
    Prefix,
    Segment(NameSeg),
}

impl AmlName {
    pub fn root() -> AmlName {
        AmlName(vec![NameComponent::Root])
    }

    pub fn as_string(&self) -> String {
        self.0
            .iter()
            .fold(String::new(), |name, component| match component {
                NameComponent::Root => name + "\\",
                NameComponent::Prefix => name + "^",
                NameComponent::Segment(seg) => name + seg.as_str() + ".",
            })
            .trim_end_matches('.')
            .to_string()
    }

    /// An AML path is normal if it does not contain any prefix elements ("^" characters, when
    /// expressed as a string).
    pub fn is_normal(&self) -> bool {
        !self.0.contains(&NameComponent::Prefix)
    }

    pub fn is_absolute(&self) -> bool {
        self.0.first() == Some(&NameComponent::Root)
    }

    /// Normalize an AML path, resolving prefix chars. Returns `AmlError::InvalidNormalizedName` if the path
    /// normalizes to an invalid path (e.g. `\^_FOO`)
    pub fn normalize(self) -> Result<AmlName, AmlError> {
        if self.is_normal() {
            return Ok(self);
        }

        let mut normalized = Vec::with_capacity(self.0.len());
        for &component in &self.0 {
            match component {
                NameComponent::Prefix => match normalized.last() {
                    Some(NameComponent::Segment(_)) => {
                        normalized.pop();
                    }
                    _ => return Err(AmlError::InvalidNormalizedName(self.clone())),
                },
                other => normalized.push(other),
            }
        }
        Ok(AmlName(normalized))
    }
}

impl FromStr for AmlName {
    type Err = AmlError;

    fn from_str(mut string: &str) -> Result<Self, Self::Err> {
        if string.is_empty() {
            return Err(AmlError::EmptyNamesAreInvalid);
        }

        let mut components = Vec::new();

        // If it starts with a \, make it an absolute name
        if let Some(rest) = string.strip_prefix('\\') {
            components.push(NameComponent::Root);
            string = rest;
        }

        if !string.is_empty() {
            for mut part in string.split('.') {
                while let Some(rest) = part.strip_prefix('^') {
                    components.push(NameComponent::Prefix);
                    part = rest;
                }

                components.push(NameComponent::Segment(NameSeg::from_str(part)?));
            }
        }

        Ok(Self(components))
    }
}

impl fmt::Display for AmlName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameSeg([u8; 4]);

impl NameSeg {
    /// Parse a name segment of up to four characters. Shorter segments are padded with `_`.
    pub fn from_str(string: &str) -> Result<NameSeg, AmlError> {
        let bytes = string.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(AmlError::InvalidNameSeg([0xff; 4]));
        }

        let mut seg = [b'_'; 4];
        seg[..bytes.len()].copy_from_slice(bytes);
        NameSeg::from_bytes(seg)
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<NameSeg, AmlError> {
        if !is_lead_name_char(bytes[0]) || !bytes[1..].iter().all(|&c| is_name_char(c)) {
            return Err(AmlError::InvalidNameSeg(bytes));
        }
        Ok(NameSeg(bytes))
    }

    pub fn as_str(&self) -> &str {
        // Only valid ASCII segments can be constructed
        str::from_utf8(&self.0).unwrap_or_default()
    }
}

pub fn is_lead_name_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'_'
}

pub fn is_name_char(c: u8) -> bool {
    is_lead_name_char(c) || c.is_ascii_digit()
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}
