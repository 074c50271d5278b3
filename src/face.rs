/*!
Facial blend-shape plumbing.

The rendering engine stays behind the [MorphMesh] trait: a mesh that can
enumerate its named morph targets and write an influence value to one of
them. Everything above that (the registry, the emotion overlay, lip sync,
blinking) only ever talks in target identifiers.
*/

pub mod blink;
pub mod emotion;
pub mod lip_sync;

use std::collections::HashMap;

use crate::Logger;

/// Viseme mouth shapes driven by the lip-sync tick.
pub const MOUTH_SHAPES: [&str; 5] = [
    "Fcl_MTH_A",
    "Fcl_MTH_I",
    "Fcl_MTH_U",
    "Fcl_MTH_E",
    "Fcl_MTH_O",
];

/// Eye shapes driven by the blink timer.
///
/// Mouth, emotion, and eye identifier sets are disjoint, so their drivers
/// never write to the same target.
pub const EYE_SHAPES: [&str; 1] = ["Fcl_EYE_Close"];

/// A mesh that exposes named, continuously-valued morph targets.
///
/// Writes take effect immediately; the next rendered frame reflects them.
pub trait MorphMesh {
    /// Name of the mesh, used for logging only.
    fn name(&self) -> &str;

    /// Every morph target this mesh exposes.
    fn morph_names(&self) -> Vec<String>;

    /// Set a target's influence, generally 0.0-1.0. Targets this mesh does
    /// not expose are ignored.
    fn set_morph(&mut self, morph: &str, value: f32);
}

/// Lookup from morph target identifiers to the meshes exposing them.
///
/// Different meshes expose different subsets of the vocabulary, and several
/// meshes may expose the same identifier; a write goes to all of them so the
/// visual effect stays consistent.
pub struct FaceRegistry {
    meshes: Vec<Box<dyn MorphMesh>>,
    mappings: HashMap<String, Vec<usize>>,
}

impl FaceRegistry {
    /// One-time classification pass over the loaded model's meshes.
    pub fn scan(meshes: Vec<Box<dyn MorphMesh>>) -> Self {
        let logger = Logger::create("FaceRegistry");

        let mut mappings: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, mesh) in meshes.iter().enumerate() {
            let names = mesh.morph_names();
            if names.is_empty() {
                logger.debug(format!(
                    "Mesh {} has no morph targets, skipping",
                    mesh.name()
                ));
                continue;
            }

            for name in names {
                mappings.entry(name).or_default().push(idx);
            }
        }

        logger.debug(format!(
            "Mapped {} morph targets across {} meshes",
            mappings.len(),
            meshes.len()
        ));

        Self { meshes, mappings }
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.mappings.contains_key(target)
    }

    /// Set `target` on every mesh exposing it. Unknown identifiers are a
    /// no-op, not an error.
    pub fn set_influence(&mut self, target: &str, value: f32) {
        let indices = match self.mappings.get(target) {
            Some(v) => v.clone(),
            None => return,
        };

        for idx in indices {
            self.meshes[idx].set_morph(target, value);
        }
    }

    /// Zero every identifier in `targets`, used to clear a whole shape
    /// family before applying a new member of it.
    pub fn reset_group(&mut self, targets: &[&str]) {
        for target in targets {
            self.set_influence(target, 0.0);
        }
    }
}

/// An in-memory mesh for tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryMesh {
    name: String,
    targets: HashMap<String, f32>,
}

impl MemoryMesh {
    pub fn new(name: impl Into<String>, targets: &[&str]) -> Self {
        Self {
            name: name.into(),
            targets: targets.iter().map(|t| (t.to_string(), 0.0)).collect(),
        }
    }

    /// Current influence of `target`, or `None` if this mesh lacks it.
    pub fn influence(&self, target: &str) -> Option<f32> {
        self.targets.get(target).copied()
    }
}

impl MorphMesh for MemoryMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn morph_names(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    fn set_morph(&mut self, morph: &str, value: f32) {
        if let Some(v) = self.targets.get_mut(morph) {
            *v = value;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{FaceRegistry, MemoryMesh, MorphMesh};

    /// Mesh handle that stays inspectable after the registry takes ownership.
    #[derive(Clone)]
    pub(crate) struct SharedMesh(Rc<RefCell<MemoryMesh>>);

    impl SharedMesh {
        pub(crate) fn new(name: &str, targets: &[&str]) -> Self {
            Self(Rc::new(RefCell::new(MemoryMesh::new(name, targets))))
        }

        pub(crate) fn influence(&self, target: &str) -> Option<f32> {
            self.0.borrow().influence(target)
        }
    }

    impl MorphMesh for SharedMesh {
        fn name(&self) -> &str {
            "shared"
        }

        fn morph_names(&self) -> Vec<String> {
            self.0.borrow().morph_names()
        }

        fn set_morph(&mut self, morph: &str, value: f32) {
            self.0.borrow_mut().set_morph(morph, value);
        }
    }

    /// A registry over a single shared mesh exposing `targets`.
    pub(crate) fn face_with(targets: &[&str]) -> (FaceRegistry, SharedMesh) {
        let mesh = SharedMesh::new("face", targets);
        let registry = FaceRegistry::scan(vec![Box::new(mesh.clone())]);
        (registry, mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{face_with, SharedMesh};
    use super::*;

    #[test]
    fn scan_maps_targets_to_every_exposing_mesh() {
        let a = SharedMesh::new("face", &["Fcl_MTH_A", "Fcl_ALL_Joy"]);
        let b = SharedMesh::new("teeth", &["Fcl_MTH_A"]);
        let mut registry =
            FaceRegistry::scan(vec![Box::new(a.clone()), Box::new(b.clone())]);

        registry.set_influence("Fcl_MTH_A", 0.5);

        assert_eq!(a.influence("Fcl_MTH_A"), Some(0.5));
        assert_eq!(b.influence("Fcl_MTH_A"), Some(0.5));
        assert_eq!(a.influence("Fcl_ALL_Joy"), Some(0.0));
    }

    #[test]
    fn unknown_target_is_a_no_op() {
        let (mut registry, mesh) = face_with(&["Fcl_MTH_A"]);

        registry.set_influence("Fcl_MTH_ZZZ", 1.0);

        assert_eq!(mesh.influence("Fcl_MTH_A"), Some(0.0));
        assert!(!registry.has_target("Fcl_MTH_ZZZ"));
    }

    #[test]
    fn reset_group_zeroes_the_family() {
        let (mut registry, mesh) = face_with(&["Fcl_MTH_A", "Fcl_MTH_I"]);
        registry.set_influence("Fcl_MTH_A", 0.75);
        registry.set_influence("Fcl_MTH_I", 0.75);

        registry.reset_group(&MOUTH_SHAPES);

        assert_eq!(mesh.influence("Fcl_MTH_A"), Some(0.0));
        assert_eq!(mesh.influence("Fcl_MTH_I"), Some(0.0));
    }

    #[test]
    fn memory_mesh_ignores_unknown_targets() {
        let mut mesh = MemoryMesh::new("face", &["Fcl_MTH_A"]);
        mesh.set_morph("Fcl_MTH_O", 1.0);

        assert_eq!(mesh.influence("Fcl_MTH_O"), None);
    }
}
