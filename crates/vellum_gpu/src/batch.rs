//! Draw call batching
//!
//! Calls are staged while the frame is recorded and turned into indexed
//! triangle-list commands when the frame ends. Consecutive commands that run
//! with the same state and cover contiguous index ranges are merged, so a
//! run of solid-color rectangles costs a single draw.

use smallvec::SmallVec;
use vellum_paint::TextureId;

use crate::error::{reserve, Result};
use crate::flatten::FlatPath;
use crate::primitives::{CallKind, CommandKind, DrawCall, DrawCommand, FragmentUniform};

/// Fill and stroke vertex ranges of one path of a call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallPath {
    pub fill_offset: u32,
    pub fill_count: u32,
    pub stroke_offset: u32,
    pub stroke_count: u32,
}

impl From<&FlatPath> for CallPath {
    fn from(path: &FlatPath) -> Self {
        Self {
            fill_offset: path.fill.0,
            fill_count: path.fill.1,
            stroke_offset: path.stroke.0,
            stroke_count: path.stroke.1,
        }
    }
}

#[derive(Debug, Default)]
pub struct Batcher {
    calls: Vec<DrawCall>,
    paths: Vec<CallPath>,
    uniforms: Vec<FragmentUniform>,
    commands: Vec<DrawCommand>,
    indices: Vec<u32>,
}

/// State a published command runs with
#[derive(Clone, Copy)]
struct Pass {
    call: CallKind,
    uniform: u32,
    texture: Option<TextureId>,
}

/// Triangle layout of a vertex range
#[derive(Clone, Copy)]
enum Topology {
    Fan,
    Strip,
    List,
    /// Four vertices forming a quad
    Quad,
}

impl Batcher {
    pub fn new(initial_commands: usize) -> Self {
        Self {
            calls: Vec::with_capacity(initial_commands),
            paths: Vec::with_capacity(initial_commands),
            uniforms: Vec::with_capacity(initial_commands),
            commands: Vec::with_capacity(initial_commands),
            indices: Vec::new(),
        }
    }

    /// Forget the previous frame, keeping capacity
    pub fn clear(&mut self) {
        self.calls.clear();
        self.paths.clear();
        self.uniforms.clear();
        self.commands.clear();
        self.indices.clear();
    }

    /// Append a uniform block and return its slot. A block identical to the
    /// previous one shares its slot.
    pub fn push_uniform(&mut self, uniform: FragmentUniform) -> Result<u32> {
        if let Some(last) = self.uniforms.last() {
            if last.same_bits(&uniform) {
                return Ok(self.uniforms.len() as u32 - 1);
            }
        }
        reserve(&mut self.uniforms, 1, "uniforms")?;
        self.uniforms.push(uniform);
        Ok(self.uniforms.len() as u32 - 1)
    }

    /// Record the vertex ranges of `paths`, returning `(offset, count)` into
    /// the call path list
    pub fn push_paths(&mut self, paths: &[FlatPath]) -> Result<(u32, u32)> {
        reserve(&mut self.paths, paths.len(), "call paths")?;
        let offset = self.paths.len() as u32;
        self.paths.extend(paths.iter().map(CallPath::from));
        Ok((offset, paths.len() as u32))
    }

    pub fn push_call(&mut self, call: DrawCall) -> Result<()> {
        reserve(&mut self.calls, 1, "calls")?;
        self.calls.push(call);
        Ok(())
    }

    /// Turn the staged calls into draw commands and indices
    pub fn publish(&mut self) -> Result<()> {
        self.commands.clear();
        self.indices.clear();

        let calls = std::mem::take(&mut self.calls);
        let result = calls.iter().try_for_each(|call| self.publish_call(call));
        self.calls = calls;
        result?;

        tracing::trace!(
            "published {} calls as {} commands ({} indices, {} uniforms)",
            self.calls.len(),
            self.commands.len(),
            self.indices.len(),
            self.uniforms.len()
        );
        Ok(())
    }

    fn publish_call(&mut self, call: &DrawCall) -> Result<()> {
        let start = call.path_offset as usize;
        let end = start + call.path_count as usize;
        let paths: SmallVec<[CallPath; 4]> = self
            .paths
            .get(start..end)
            .map(SmallVec::from_slice)
            .unwrap_or_default();
        let paint = Pass {
            call: call.kind,
            uniform: call.uniforms[0],
            texture: call.texture,
        };

        match call.kind {
            CallKind::Fill => {
                let stencil = Pass {
                    texture: None,
                    ..paint
                };
                let cover = Pass {
                    uniform: call.uniforms[1],
                    ..paint
                };
                for p in &paths {
                    let range = (p.fill_offset, p.fill_count);
                    self.emit(CommandKind::StencilFill, stencil, Topology::Fan, range)?;
                }
                for p in &paths {
                    let range = (p.stroke_offset, p.stroke_count);
                    self.emit(CommandKind::Fringe, cover, Topology::Strip, range)?;
                }
                let range = (call.triangle_offset, call.triangle_count);
                self.emit(CommandKind::Cover, cover, Topology::Quad, range)?;
            }
            CallKind::ConvexFill => {
                for p in &paths {
                    let fan = (p.fill_offset, p.fill_count);
                    self.emit(CommandKind::ConvexFill, paint, Topology::Fan, fan)?;
                    let fringe = (p.stroke_offset, p.stroke_count);
                    self.emit(CommandKind::ConvexFill, paint, Topology::Strip, fringe)?;
                }
            }
            CallKind::Stroke => {
                for p in &paths {
                    let range = (p.stroke_offset, p.stroke_count);
                    self.emit(CommandKind::Stroke, paint, Topology::Strip, range)?;
                }
            }
            CallKind::Triangles => {
                let range = (call.triangle_offset, call.triangle_count);
                self.emit(CommandKind::Triangles, paint, Topology::List, range)?;
            }
        }
        Ok(())
    }

    /// Emit indices for the `(offset, count)` vertex range and record the command
    fn emit(
        &mut self,
        kind: CommandKind,
        pass: Pass,
        topology: Topology,
        (vertex_offset, vertex_count): (u32, u32),
    ) -> Result<()> {
        let index_offset = self.indices.len() as u32;
        let o = vertex_offset;
        let n = vertex_count;

        match topology {
            Topology::Fan if n >= 3 => {
                reserve(&mut self.indices, (n as usize - 2) * 3, "indices")?;
                for i in 1..n - 1 {
                    self.indices.extend_from_slice(&[o, o + i, o + i + 1]);
                }
            }
            Topology::Strip if n >= 3 => {
                reserve(&mut self.indices, (n as usize - 2) * 3, "indices")?;
                for i in 0..n - 2 {
                    // Alternate so every triangle keeps the strip's winding
                    if i % 2 == 0 {
                        self.indices.extend_from_slice(&[o + i, o + i + 1, o + i + 2]);
                    } else {
                        self.indices.extend_from_slice(&[o + i + 1, o + i, o + i + 2]);
                    }
                }
            }
            Topology::List => {
                let n = n - n % 3;
                reserve(&mut self.indices, n as usize, "indices")?;
                self.indices.extend(o..o + n);
            }
            Topology::Quad if n >= 4 => {
                reserve(&mut self.indices, 6, "indices")?;
                self.indices
                    .extend_from_slice(&[o, o + 1, o + 2, o + 2, o + 1, o + 3]);
            }
            _ => {}
        }

        let index_count = self.indices.len() as u32 - index_offset;
        self.push_command(DrawCommand {
            kind,
            call: pass.call,
            uniform: pass.uniform,
            texture: pass.texture,
            index_offset,
            index_count,
            vertex_offset,
            vertex_count,
        })
    }

    fn push_command(&mut self, command: DrawCommand) -> Result<()> {
        if command.index_count == 0 {
            return Ok(());
        }
        if let Some(last) = self.commands.last_mut() {
            let last_end = last.index_offset.saturating_add(last.index_count);
            if last_end == command.index_offset
                && last.kind == command.kind
                && last.call == command.call
                && last.uniform == command.uniform
                && last.texture == command.texture
            {
                let start = last.vertex_offset.min(command.vertex_offset);
                let end = (last.vertex_offset + last.vertex_count)
                    .max(command.vertex_offset + command.vertex_count);
                last.index_count = last.index_count.saturating_add(command.index_count);
                last.vertex_offset = start;
                last.vertex_count = end - start;
                return Ok(());
            }
        }
        reserve(&mut self.commands, 1, "commands")?;
        self.commands.push(command);
        Ok(())
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn paths(&self) -> &[CallPath] {
        &self.paths
    }

    pub fn uniforms(&self) -> &[FragmentUniform] {
        &self.uniforms
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(fill: (u32, u32), stroke: (u32, u32)) -> FlatPath {
        FlatPath {
            fill,
            stroke,
            ..Default::default()
        }
    }

    fn call(kind: CallKind, uniform: u32, paths: (u32, u32)) -> DrawCall {
        DrawCall {
            kind,
            uniforms: [uniform, uniform],
            texture: None,
            path_offset: paths.0,
            path_count: paths.1,
            triangle_offset: 0,
            triangle_count: 0,
        }
    }

    #[test]
    fn test_uniform_dedup() {
        let mut batch = Batcher::new(4);
        let a = batch.push_uniform(FragmentUniform::default()).unwrap();
        let b = batch.push_uniform(FragmentUniform::default()).unwrap();
        let c = batch.push_uniform(FragmentUniform::stencil()).unwrap();
        assert_eq!((a, b, c), (0, 0, 1));
        assert_eq!(batch.uniforms().len(), 2);
    }

    #[test]
    fn test_convex_fills_merge() {
        let mut batch = Batcher::new(4);
        let u = batch.push_uniform(FragmentUniform::default()).unwrap();
        let first = batch.push_paths(&[path((0, 4), (4, 0))]).unwrap();
        batch.push_call(call(CallKind::ConvexFill, u, first)).unwrap();
        let second = batch.push_paths(&[path((4, 4), (8, 0))]).unwrap();
        batch.push_call(call(CallKind::ConvexFill, u, second)).unwrap();
        batch.publish().unwrap();

        assert_eq!(batch.commands().len(), 1);
        let cmd = batch.commands()[0];
        assert_eq!(cmd.kind, CommandKind::ConvexFill);
        assert_eq!((cmd.index_offset, cmd.index_count), (0, 12));
        assert_eq!((cmd.vertex_offset, cmd.vertex_count), (0, 8));
        assert_eq!(batch.indices(), &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_no_merge_across_textures() {
        let mut batch = Batcher::new(4);
        let u = batch.push_uniform(FragmentUniform::default()).unwrap();
        for (i, texture) in [Some(TextureId(1)), Some(TextureId(2))].into_iter().enumerate() {
            let offset = i as u32 * 6;
            batch
                .push_call(DrawCall {
                    kind: CallKind::Triangles,
                    uniforms: [u, u],
                    texture,
                    path_offset: 0,
                    path_count: 0,
                    triangle_offset: offset,
                    triangle_count: 6,
                })
                .unwrap();
        }
        batch.publish().unwrap();
        assert_eq!(batch.commands().len(), 2);
        assert_eq!(batch.commands()[1].index_offset, 6);
    }

    #[test]
    fn test_fill_stencil_fringe_cover() {
        let mut batch = Batcher::new(4);
        let stencil = batch.push_uniform(FragmentUniform::stencil()).unwrap();
        let paint = batch.push_uniform(FragmentUniform::default()).unwrap();
        let paths = batch.push_paths(&[path((0, 5), (5, 12))]).unwrap();
        batch
            .push_call(DrawCall {
                kind: CallKind::Fill,
                uniforms: [stencil, paint],
                texture: None,
                path_offset: paths.0,
                path_count: paths.1,
                triangle_offset: 17,
                triangle_count: 4,
            })
            .unwrap();
        batch.publish().unwrap();

        let kinds: Vec<_> = batch.commands().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CommandKind::StencilFill, CommandKind::Fringe, CommandKind::Cover]);
        assert_eq!(batch.commands()[0].uniform, stencil);
        assert_eq!(batch.commands()[0].index_count, 9);
        assert_eq!(batch.commands()[1].index_count, 30);
        let cover = batch.commands()[2];
        assert_eq!(cover.uniform, paint);
        let start = cover.index_offset as usize;
        assert_eq!(&batch.indices()[start..start + 6], &[17, 18, 19, 19, 18, 20]);
    }

    #[test]
    fn test_strip_keeps_winding() {
        let mut batch = Batcher::new(1);
        let u = batch.push_uniform(FragmentUniform::default()).unwrap();
        let paths = batch.push_paths(&[path((0, 0), (0, 5))]).unwrap();
        batch.push_call(call(CallKind::Stroke, u, paths)).unwrap();
        batch.publish().unwrap();
        assert_eq!(batch.indices(), &[0, 1, 2, 2, 1, 3, 2, 3, 4]);
    }

    #[test]
    fn test_empty_ranges_skipped() {
        let mut batch = Batcher::new(1);
        let u = batch.push_uniform(FragmentUniform::default()).unwrap();
        let paths = batch.push_paths(&[path((0, 0), (0, 0))]).unwrap();
        batch.push_call(call(CallKind::Stroke, u, paths)).unwrap();
        batch.publish().unwrap();
        assert!(batch.commands().is_empty());
        assert_eq!(batch.calls().len(), 1);
    }
}
