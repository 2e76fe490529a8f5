//! Tests for the attribute reader tables, matrix state and command encoding.

mod common;

use common::{payload, RecordingQueue};
use glam::{Mat4, Vec3};

use n64gl_core::attrib::cpu::cpu_reader;
use n64gl_core::attrib::rsp::rsp_reader;
use n64gl_core::attrib::{AttribValue, HalfFixedPrecision, ReadContext};
use n64gl_core::gpu::commands::{CommandStream, GlpCommand};
use n64gl_core::math::fixed::{f32_to_1_15, f32_to_s15_16, f32_to_texcoord, f32_to_vtx};
use n64gl_core::state::matrix::{MatrixMode, MatrixState};
use n64gl_core::{AttribKind, AttribType, GlError, HalfFixed};

fn ne_bytes<T: n64gl_core::Component>(values: &[T]) -> Vec<u8> {
    AttribValue::from_components(values).bytes().to_vec()
}

/// Run an RSP reader and return the bytes it appended.
fn rsp_read(kind: AttribKind, ty: AttribType, src: &[u8], count: usize, ctx: &ReadContext) -> Vec<u8> {
    let read = rsp_reader(kind, ty).expect("reader exists");
    let mut stream = CommandStream::new(GlpCommand::SetPrimVtx);
    read(&mut stream, src, count, ctx);
    let len = stream.len() - 1;
    let mut queue = RecordingQueue::default();
    stream.submit(&mut queue);
    let words = queue.commands.borrow()[0].clone();
    payload(&words)[..len].to_vec()
}

// ============================================================================
// CPU readers
// ============================================================================

mod cpu_reader_tests {
    use super::*;

    #[test]
    fn unsigned_color_normalizes() {
        let read = cpu_reader(AttribKind::Color, AttribType::UnsignedByte).expect("reader");
        let mut dst = [0.0; 3];
        read(&mut dst, &[255, 0, 51], &ReadContext::default());
        assert_eq!(dst, [1.0, 0.0, 0.2]);
    }

    #[test]
    fn signed_normal_clamps_to_minus_one() {
        let read = cpu_reader(AttribKind::Normal, AttribType::Byte).expect("reader");
        let mut dst = [0.0; 3];
        read(&mut dst, &ne_bytes(&[-128i8, 127, 0]), &ReadContext::default());
        assert_eq!(dst, [-1.0, 1.0, 0.0]);
    }

    #[test]
    fn positions_are_not_normalized() {
        let read = cpu_reader(AttribKind::Vertex, AttribType::Short).expect("reader");
        let mut dst = [0.0; 2];
        read(&mut dst, &ne_bytes(&[300i16, -7]), &ReadContext::default());
        assert_eq!(dst, [300.0, -7.0]);
    }

    #[test]
    fn half_fixed_uses_configured_precision() {
        let read = cpu_reader(AttribKind::Vertex, AttribType::HalfFixed).expect("reader");
        let ctx = ReadContext {
            vertex_precision: HalfFixedPrecision::new(8, 5),
            ..ReadContext::default()
        };
        let mut dst = [0.0; 2];
        read(&mut dst, &ne_bytes(&[HalfFixed(256), HalfFixed(-64)]), &ctx);
        assert_eq!(dst, [1.0, -0.25]);
    }

    #[test]
    fn unsupported_combinations_have_no_reader() {
        assert!(cpu_reader(AttribKind::Vertex, AttribType::Byte).is_none());
        assert!(cpu_reader(AttribKind::Color, AttribType::HalfFixed).is_none());
        assert!(cpu_reader(AttribKind::MatrixIndex, AttribType::Float).is_none());
        assert!(rsp_reader(AttribKind::Normal, AttribType::UnsignedByte).is_none());
    }

    #[test]
    fn validate_checks_size_and_type() {
        assert_eq!(AttribKind::Vertex.validate(3, AttribType::Float), Ok(()));
        assert!(matches!(
            AttribKind::Vertex.validate(1, AttribType::Float),
            Err(GlError::InvalidValue(_))
        ));
        assert!(matches!(
            AttribKind::Normal.validate(3, AttribType::UnsignedInt),
            Err(GlError::InvalidEnum(_))
        ));
        assert!(AttribKind::TexCoord.validate(1, AttribType::Short).is_ok());
    }
}

// ============================================================================
// RSP readers
// ============================================================================

mod rsp_reader_tests {
    use super::*;

    #[test]
    fn float_position_is_s10_5() {
        let out = rsp_read(
            AttribKind::Vertex,
            AttribType::Float,
            &ne_bytes(&[1.5f32, -1.0]),
            2,
            &ReadContext::default(),
        );
        assert_eq!(out, vec![0x00, 0x30, 0xFF, 0xE0]);
    }

    #[test]
    fn short_position_shifts_into_place() {
        let out = rsp_read(
            AttribKind::Vertex,
            AttribType::Short,
            &ne_bytes(&[3i16]),
            1,
            &ReadContext::default(),
        );
        assert_eq!(out, (3i16 << 5).to_be_bytes().to_vec());
    }

    #[test]
    fn byte_color_is_1_15() {
        let out = rsp_read(
            AttribKind::Color,
            AttribType::UnsignedByte,
            &[255, 0],
            2,
            &ReadContext::default(),
        );
        assert_eq!(out, vec![0x7F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn float_normal_is_1_7() {
        let out = rsp_read(
            AttribKind::Normal,
            AttribType::Float,
            &ne_bytes(&[0.5f32, -1.0, 0.0]),
            3,
            &ReadContext::default(),
        );
        assert_eq!(out, vec![0x40, 0x80, 0x00]);
    }

    #[test]
    fn half_fixed_texcoord_shifts_to_target() {
        let ctx = ReadContext {
            texcoord_precision: HalfFixedPrecision::new(4, 8),
            ..ReadContext::default()
        };
        let out = rsp_read(
            AttribKind::TexCoord,
            AttribType::HalfFixed,
            &ne_bytes(&[HalfFixed(0x10)]),
            1,
            &ctx,
        );
        assert_eq!(out, 0x0100u16.to_be_bytes().to_vec());
    }

    #[test]
    fn count_limits_components() {
        let out = rsp_read(
            AttribKind::Vertex,
            AttribType::Float,
            &ne_bytes(&[1.0f32, 2.0, 3.0]),
            2,
            &ReadContext::default(),
        );
        assert_eq!(out.len(), 4);
    }
}

// ============================================================================
// Fixed point and command encoding
// ============================================================================

mod encoding_tests {
    use super::*;

    #[test]
    fn fixed_conversions_saturate() {
        assert_eq!(f32_to_vtx(1.0), 32);
        assert_eq!(f32_to_vtx(5000.0), i16::MAX);
        assert_eq!(f32_to_texcoord(-1.0), -256);
        assert_eq!(f32_to_1_15(2.0), i16::MAX);
        assert_eq!(f32_to_1_15(f32::NAN), 0);
        assert_eq!(f32_to_s15_16(1.5), 0x0001_8000);
        assert_eq!(f32_to_s15_16(-1.0), -0x0001_0000);
    }

    #[test]
    fn command_pads_to_whole_words() {
        let mut stream = CommandStream::new(GlpCommand::DrawTri);
        stream.put_half(0);
        stream.put_half(45);
        stream.put_half(90);
        assert_eq!(stream.len(), 7);

        let mut queue = RecordingQueue::default();
        stream.submit(&mut queue);
        assert_eq!(queue.commands.borrow()[0], vec![0x0300_0000, 0x2D00_5A00]);
    }

    #[test]
    fn command_ids_round_trip() {
        for id in 0..=0x0D {
            let cmd = GlpCommand::from_id(id).expect("known id");
            assert_eq!(cmd as u8, id);
        }
        assert_eq!(GlpCommand::from_id(0x0E), None);
    }
}

// ============================================================================
// Matrix state
// ============================================================================

mod matrix_tests {
    use super::*;

    #[test]
    fn mvp_is_recomputed_only_when_dirty() {
        let mut matrices = MatrixState::default();
        matrices.update_targets();
        assert_eq!(matrices.mvp_updates(), 1);
        matrices.update_targets();
        assert_eq!(matrices.mvp_updates(), 1, "clean target must not be recomputed");

        matrices.mode = MatrixMode::Texture;
        matrices.load(Mat4::from_scale(Vec3::splat(2.0)));
        matrices.update_targets();
        assert_eq!(matrices.mvp_updates(), 1, "texture matrix is not part of the MVP");

        matrices.mode = MatrixMode::Projection;
        matrices.load(Mat4::from_scale(Vec3::splat(3.0)));
        matrices.mode = MatrixMode::ModelView;
        matrices.mult(&Mat4::from_translation(Vec3::X));
        assert!(matrices.default_target().is_dirty());
        matrices.update_targets();
        assert_eq!(matrices.mvp_updates(), 2);
        assert_eq!(
            *matrices.mvp_for(0),
            Mat4::from_scale(Vec3::splat(3.0)) * Mat4::from_translation(Vec3::X)
        );
    }

    #[test]
    fn palette_entries_have_their_own_mvp() {
        let mut matrices = MatrixState::default();
        matrices.palette_enabled = true;
        matrices.mode = MatrixMode::Palette;
        matrices.set_current_palette(3).expect("in range");
        matrices.load(Mat4::from_translation(Vec3::Y));
        matrices.update_targets();

        assert_eq!(*matrices.mvp_for(3), Mat4::from_translation(Vec3::Y));
        assert_eq!(*matrices.mvp_for(0), Mat4::IDENTITY);
        assert_eq!(*matrices.modelview_for(3), Mat4::from_translation(Vec3::Y));
        assert!(matrices.set_current_palette(16).is_err());
    }

    #[test]
    fn push_and_pop_respect_depth() {
        let mut matrices = MatrixState::default();
        matrices.mode = MatrixMode::Projection;
        assert_eq!(matrices.push(), Ok(()));
        assert_eq!(matrices.push(), Err(GlError::StackOverflow));
        matrices.load(Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(matrices.pop(), Ok(()));
        assert_eq!(*matrices.projection(), Mat4::IDENTITY);
        assert_eq!(matrices.pop(), Err(GlError::StackUnderflow));
    }
}
