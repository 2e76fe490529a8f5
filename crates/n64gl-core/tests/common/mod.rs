//! Recording doubles for the rasterizer and the RSP command queue.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use n64gl_core::gpu::commands::GlpCommand;
use n64gl_core::{ContextConfig, GlContext};
use n64gl_hal::{CommandQueue, Rasterizer, Rect, ScreenVertex, TexRect, TriangleFormat};

/// One call made to the rasterizer.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterCall {
    Triangle(TriangleFormat, [ScreenVertex; 3]),
    FillRect(Rect),
    TexRect(Rect, TexRect),
    PrimDepth(u16),
    PrimColor([u8; 4]),
}

/// Rasterizer that records every call into a log shared with the test.
#[derive(Clone, Default)]
pub struct RecordingRasterizer {
    pub calls: Rc<RefCell<Vec<RasterCall>>>,
}

impl RecordingRasterizer {
    pub fn triangles(&self) -> Vec<[ScreenVertex; 3]> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                RasterCall::Triangle(_, v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn triangle_formats(&self) -> Vec<TriangleFormat> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                RasterCall::Triangle(format, _) => Some(*format),
                _ => None,
            })
            .collect()
    }
}

impl Rasterizer for RecordingRasterizer {
    fn draw_triangle(&mut self, format: &TriangleFormat, v0: &ScreenVertex, v1: &ScreenVertex, v2: &ScreenVertex) {
        self.calls
            .borrow_mut()
            .push(RasterCall::Triangle(*format, [*v0, *v1, *v2]));
    }

    fn fill_rectangle(&mut self, rect: &Rect) {
        self.calls.borrow_mut().push(RasterCall::FillRect(*rect));
    }

    fn texture_rectangle(&mut self, rect: &Rect, tex: &TexRect) {
        self.calls.borrow_mut().push(RasterCall::TexRect(*rect, *tex));
    }

    fn set_prim_depth(&mut self, depth: u16) {
        self.calls.borrow_mut().push(RasterCall::PrimDepth(depth));
    }

    fn set_prim_color(&mut self, rgba: [u8; 4]) {
        self.calls.borrow_mut().push(RasterCall::PrimColor(rgba));
    }
}

/// Command queue that records every command's words.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    pub commands: Rc<RefCell<Vec<Vec<u32>>>>,
}

impl RecordingQueue {
    /// Command ids in submission order.
    pub fn ids(&self) -> Vec<GlpCommand> {
        self.commands
            .borrow()
            .iter()
            .map(|words| GlpCommand::from_id((words[0] >> 24) as u8).expect("unknown command id"))
            .collect()
    }

    /// Words of every command with id `cmd`.
    pub fn find(&self, cmd: GlpCommand) -> Vec<Vec<u32>> {
        self.commands
            .borrow()
            .iter()
            .filter(|words| (words[0] >> 24) as u8 == cmd as u8)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }
}

impl CommandQueue for RecordingQueue {
    fn push(&mut self, words: &[u32]) {
        self.commands.borrow_mut().push(words.to_vec());
    }
}

/// Payload bytes of a command (everything after the id byte).
pub fn payload(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).skip(1).collect()
}

pub type TestContext = GlContext<RecordingRasterizer, RecordingQueue>;

/// Context plus handles on the logs of its collaborators.
pub fn make_context(config: ContextConfig) -> (TestContext, RecordingRasterizer, RecordingQueue) {
    let _ = env_logger::builder().is_test(true).try_init();
    let rdp = RecordingRasterizer::default();
    let queue = RecordingQueue::default();
    let ctx = GlContext::new(config, rdp.clone(), queue.clone());
    (ctx, rdp, queue)
}

/// Context that always runs the CPU pipeline.
pub fn cpu_context() -> (TestContext, RecordingRasterizer, RecordingQueue) {
    make_context(ContextConfig {
        force_cpu_pipeline: true,
        ..ContextConfig::default()
    })
}

/// Signed screen-space area of a recorded triangle (doubled).
pub fn screen_area(v: &[ScreenVertex; 3]) -> f32 {
    let [a, b, c] = v.map(|v| v.position);
    a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1])
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
