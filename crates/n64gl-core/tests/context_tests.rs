//! Error reporting and state setters of the context.

mod common;

use std::sync::Arc;

use common::cpu_context;
use glam::{Mat4, Vec3, Vec4};

use n64gl_core::state::arrays::ArrayPointer;
use n64gl_core::state::matrix::MatrixMode;
use n64gl_core::state::{
    Capability, FogParam, LightModelParam, LightParam, RenderMode, TexCoord, TexGenMode, TexGenParam,
};
use n64gl_core::{AttribKind, AttribType, GlError, Indices, PrimitiveMode};

fn three_vertices() -> ArrayPointer {
    let bytes: Vec<u8> = [0.0f32, 0.0, 0.5, 0.0, 0.0, 0.5]
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();
    ArrayPointer::Client(Arc::from(bytes))
}

// ============================================================================
// Sticky error
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn no_error_initially() {
        let (mut ctx, _, _) = cpu_context();
        assert_eq!(ctx.get_error(), None);
    }

    #[test]
    fn first_error_wins_until_queried() {
        let (mut ctx, _, _) = cpu_context();
        ctx.vertex(&[0.0f32, 0.0]);
        ctx.color(&[1.0f32, 0.0]);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        assert_eq!(ctx.get_error(), None, "reading clears the error");
    }

    #[test]
    fn begin_end_pairing() {
        let (mut ctx, _, _) = cpu_context();
        ctx.end();
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));

        ctx.begin(PrimitiveMode::Triangles);
        ctx.begin(PrimitiveMode::Points);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.end();
        assert_eq!(ctx.get_error(), None);
    }

    #[test]
    fn state_changes_are_rejected_inside_block() {
        let (mut ctx, _, _) = cpu_context();
        ctx.begin(PrimitiveMode::Triangles);
        ctx.matrix_mode(MatrixMode::Projection);
        ctx.enable(Capability::Lighting);
        ctx.draw_arrays(PrimitiveMode::Triangles, 0, 3);
        ctx.end();

        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        assert_eq!(ctx.state().matrices.mode, MatrixMode::ModelView);
        assert!(!ctx.is_enabled(Capability::Lighting));
    }

    #[test]
    fn degenerate_projection_inside_block_is_invalid_operation() {
        let (mut ctx, _, _) = cpu_context();
        ctx.begin(PrimitiveMode::Triangles);
        ctx.frustum(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.ortho(0.0, 0.0, -1.0, 1.0, -1.0, 1.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.rotate(45.0, 0.0, 0.0, 0.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.end();
        assert_eq!(ctx.get_error(), None);

        ctx.ortho(0.0, 0.0, -1.0, 1.0, -1.0, 1.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));
        assert_eq!(*ctx.state().matrices.modelview(), Mat4::IDENTITY);
    }

    #[test]
    fn bad_component_count_is_invalid_value() {
        let (mut ctx, _, _) = cpu_context();
        ctx.color(&[1.0f32, 0.0]);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));
        assert_eq!(ctx.state().current.color, Vec4::ONE, "current color unchanged");

        ctx.normal(&[1.0f32, 0.0]);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));
    }

    #[test]
    fn bad_enums() {
        let (mut ctx, _, _) = cpu_context();
        ctx.light(8, LightParam::Diffuse(Vec4::ONE));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidEnum(_))));

        ctx.tex_gen(TexCoord::R, TexGenParam::Mode(TexGenMode::SphereMap));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidEnum(_))));

        ctx.normal_pointer(AttribType::UnsignedByte, 0, three_vertices());
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidEnum(_))));
    }

    #[test]
    fn bad_values() {
        let (mut ctx, _, _) = cpu_context();
        ctx.point_size(0.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));

        ctx.light(0, LightParam::SpotCutoff(120.0));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));

        ctx.vertex_half_fixed_precision(16);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));

        ctx.frustum(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidValue(_))));
    }

    #[test]
    fn matrix_stack_limits() {
        let (mut ctx, _, _) = cpu_context();
        ctx.pop_matrix();
        assert_eq!(ctx.get_error(), Some(GlError::StackUnderflow));

        ctx.matrix_mode(MatrixMode::Projection);
        ctx.push_matrix();
        assert_eq!(ctx.get_error(), None);
        ctx.push_matrix();
        assert_eq!(ctx.get_error(), Some(GlError::StackOverflow));
    }

    #[test]
    #[should_panic(expected = "stencil")]
    fn stencil_test_is_fatal() {
        let (mut ctx, _, _) = cpu_context();
        ctx.enable(Capability::StencilTest);
    }

    #[test]
    #[should_panic(expected = "render mode")]
    fn feedback_mode_is_fatal() {
        let (mut ctx, _, _) = cpu_context();
        ctx.render_mode(RenderMode::Render);
        ctx.render_mode(RenderMode::Feedback);
    }

    #[test]
    #[should_panic(expected = "two-sided")]
    fn two_sided_lighting_is_fatal() {
        let (mut ctx, _, _) = cpu_context();
        ctx.light_model(LightModelParam::TwoSide(true));
    }
}

// ============================================================================
// Vertex arrays
// ============================================================================

mod array_tests {
    use super::*;

    #[test]
    fn out_of_range_draw_reads_nothing() {
        let (mut ctx, rdp, _) = cpu_context();
        ctx.vertex_pointer(2, AttribType::Float, 0, three_vertices());
        ctx.enable_client_state(AttribKind::Vertex);

        ctx.draw_arrays(PrimitiveMode::Triangles, 1, 3);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.draw_elements(PrimitiveMode::Triangles, Indices::U16(&[0, 1, 3]));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        assert!(rdp.calls.borrow().is_empty());

        ctx.draw_arrays(PrimitiveMode::Triangles, 0, 3);
        assert_eq!(ctx.get_error(), None);
        assert_eq!(rdp.triangles().len(), 1);
    }

    #[test]
    fn empty_draws_are_no_ops() {
        let (mut ctx, rdp, _) = cpu_context();
        ctx.draw_arrays(PrimitiveMode::Triangles, 0, 0);
        ctx.draw_elements(PrimitiveMode::Triangles, Indices::U8(&[]));
        assert_eq!(ctx.get_error(), None);
        assert!(rdp.calls.borrow().is_empty());
        assert_eq!(ctx.last_pipeline(), None);
    }

    #[test]
    fn enabled_array_without_data_is_an_error() {
        let (mut ctx, _, _) = cpu_context();
        ctx.enable_client_state(AttribKind::Vertex);
        ctx.draw_arrays(PrimitiveMode::Points, 0, 1);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
    }

    #[test]
    fn buffer_offset_needs_a_bound_buffer() {
        let (mut ctx, _, _) = cpu_context();
        ctx.vertex_pointer(3, AttribType::Float, 0, ArrayPointer::Offset(0));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
    }

    #[test]
    fn stale_buffer_handles_are_rejected() {
        let (mut ctx, _, _) = cpu_context();
        let buffer = ctx.gen_buffer();
        ctx.delete_buffer(buffer);
        assert_eq!(ctx.get_error(), None);

        ctx.bind_array_buffer(Some(buffer));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
        ctx.delete_buffer(buffer);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));

        let fresh = ctx.gen_buffer();
        assert_ne!(fresh, buffer, "recycled slot gets a new generation");
    }

    #[test]
    fn array_element_outside_block_with_vertex_array() {
        let (mut ctx, _, _) = cpu_context();
        ctx.vertex_pointer(2, AttribType::Float, 0, three_vertices());
        ctx.enable_client_state(AttribKind::Vertex);
        ctx.array_element(0);
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidOperation(_))));
    }
}

// ============================================================================
// State setters
// ============================================================================

mod setter_tests {
    use super::*;

    #[test]
    fn matrix_helpers_multiply_current_matrix() {
        let (mut ctx, _, _) = cpu_context();
        ctx.translate(1.0, 2.0, 3.0);
        ctx.scale(2.0, 2.0, 2.0);
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_scale(Vec3::splat(2.0));
        assert_eq!(*ctx.state().matrices.modelview(), expected);

        ctx.load_identity();
        ctx.rotate(90.0, 0.0, 0.0, 1.0);
        let x = ctx.state().matrices.modelview().transform_point3(Vec3::X);
        assert!((x - Vec3::Y).abs().max_element() < 1e-6, "{x}");

        ctx.rotate(45.0, 0.0, 0.0, 0.0);
        assert_eq!(ctx.get_error(), None, "zero axis is ignored");
    }

    #[test]
    fn light_position_is_transformed_by_modelview() {
        let (mut ctx, _, _) = cpu_context();
        ctx.translate(0.0, 0.0, -5.0);
        ctx.light(1, LightParam::Position(Vec4::new(0.0, 0.0, 0.0, 1.0)));
        assert_eq!(ctx.state().lighting.lights[1].position, Vec4::new(0.0, 0.0, -5.0, 1.0));
    }

    #[test]
    fn fog_ramp_is_precomputed() {
        let (mut ctx, _, _) = cpu_context();
        ctx.fog(FogParam::Start(2.0));
        ctx.fog(FogParam::End(6.0));
        let fog = ctx.state().fog;
        assert_eq!(fog.factor, 0.25);
        assert_eq!(fog.factor_at(-4.0), 0.5);
    }

    #[test]
    fn viewport_offset_accounts_for_origin() {
        let (mut ctx, _, _) = cpu_context();
        ctx.viewport(10, 20, 100, 50);
        let viewport = ctx.state().viewport;
        assert_eq!(viewport.scale, Vec3::new(50.0, -25.0, 0.5));
        assert_eq!(viewport.offset, Vec3::new(60.0, 195.0, 0.5));
    }

    #[test]
    fn normalize_capability_sets_flag() {
        let (mut ctx, _, _) = cpu_context();
        assert!(!ctx.state().flags.normalize);
        ctx.enable(Capability::Normalize);
        assert!(ctx.state().flags.normalize);
        assert!(ctx.is_enabled(Capability::Normalize));
    }

    #[test]
    fn is_enabled_reports_lights() {
        let (mut ctx, _, _) = cpu_context();
        assert!(!ctx.is_enabled(Capability::Light(3)));
        ctx.enable(Capability::Light(3));
        assert!(ctx.is_enabled(Capability::Light(3)));
        assert!(!ctx.is_enabled(Capability::Light(9)));
        assert!(matches!(ctx.get_error(), Some(GlError::InvalidEnum(_))));
    }
}
