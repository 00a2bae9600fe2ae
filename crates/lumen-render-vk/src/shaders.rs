// SPDX-License-Identifier: CEPL-1.0
//! Built-in SPIR-V for the triangle scenes, compiled by `build.rs`.

use lumen_render::{SceneKind, ShaderSet};

const PROCEDURAL_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/tri_procedural.vert.spv"));
const BUFFERED_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/tri_buffered.vert.spv"));
const TRI_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/tri.frag.spv"));

/// Shaders matching the vertex input each [`SceneKind`] binds.
pub fn builtin(scene: SceneKind) -> ShaderSet {
    let vertex = match scene {
        SceneKind::Procedural => PROCEDURAL_VERT,
        SceneKind::VertexBuffer => BUFFERED_VERT,
    };
    ShaderSet {
        vertex: vertex.to_vec(),
        fragment: TRI_FRAG.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ash::util::read_spv;

    use super::*;

    #[test]
    fn builtin_shaders_are_valid_spirv() {
        for scene in [SceneKind::Procedural, SceneKind::VertexBuffer] {
            let set = builtin(scene);
            let words = read_spv(&mut Cursor::new(&set.vertex[..])).unwrap();
            assert_eq!(words[0], 0x0723_0203);
            read_spv(&mut Cursor::new(&set.fragment[..])).unwrap();
        }
    }

    #[test]
    fn scenes_get_different_vertex_stages() {
        assert_ne!(
            builtin(SceneKind::Procedural).vertex,
            builtin(SceneKind::VertexBuffer).vertex
        );
    }
}
