//! Off-screen render targets and the directional shadow map.

use glam::{Mat4, Vec3};

use crate::shader::{UniformLoader, ViewUniform};
use crate::texture::Texture;

/// Maps clip-space x,y from [-1, 1] to texture space [0, 1], flipping y
/// because texture rows grow downwards. wgpu clip z is already in [0, 1].
pub const DEPTH_BIAS: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, -0.5, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.5, 0.5, 0.0, 1.0,
]);

/// `DEPTH_BIAS * projection * view`: world space to shadow-map texture space.
pub fn depth_bias_pv(view: Mat4, projection: Mat4) -> Mat4 {
    DEPTH_BIAS * projection * view
}

/// Light view and orthographic projection framing `focus`.
///
/// The eye sits `depth_range` away from the focus along `towards_light`. The
/// focus is snapped to whole shadow-map texels in light space so the
/// projected shadows stay put while the focus moves.
pub fn light_space(towards_light: Vec3, focus: Vec3, half_extent: f32, depth_range: f32, texture_size: u32) -> (Mat4, Mat4) {
    let dir = towards_light.normalize_or(Vec3::Y);
    let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };

    let rotation = Mat4::look_at_rh(Vec3::ZERO, -dir, up);
    let texel = 2.0 * half_extent / texture_size.max(1) as f32;
    let local = rotation.transform_point3(focus);
    let snapped = Vec3::new((local.x / texel).round() * texel, (local.y / texel).round() * texel, local.z);
    let center = rotation.inverse().transform_point3(snapped);

    let view = Mat4::look_at_rh(center + dir * depth_range, center, up);
    let projection = Mat4::orthographic_rh(-half_extent, half_extent, -half_extent, half_extent, 0.0, 2.0 * depth_range);
    (view, projection)
}

/// Borrowed colour + depth attachments for one pass.
#[derive(Clone, Copy)]
pub struct RenderTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    /// Begin a colour pass. `clear` clears colour and depth; `None` loads both.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
        clear: Option<wgpu::Color>,
    ) -> wgpu::RenderPass<'e> {
        let (color_load, depth_load) = match clear {
            Some(color) => (wgpu::LoadOp::Clear(color), wgpu::LoadOp::Clear(1.0)),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

/// Off-screen target: optional colour attachment plus depth.
pub struct FrameBuffer {
    color: Option<Texture>,
    depth: Texture,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Colour + depth target, e.g. for the water reflection.
    pub fn with_color(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat, label: &str) -> Self {
        Self {
            color: Some(Texture::create_render_target(device, width, height, format, label)),
            depth: Texture::create_depth_texture(device, width, height, label),
            width,
            height,
        }
    }

    /// Depth-only target.
    pub fn depth_only(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        Self {
            color: None,
            depth: Texture::create_depth_texture(device, width, height, label),
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color(&self) -> Option<&Texture> {
        self.color.as_ref()
    }

    pub fn depth(&self) -> &Texture {
        &self.depth
    }

    /// Attachments for a colour pass; `None` for depth-only buffers.
    pub fn target(&self) -> Option<RenderTarget<'_>> {
        self.color.as_ref().map(|color| RenderTarget {
            color: &color.view,
            depth: &self.depth.view,
        })
    }

    /// Begin a depth-only pass that clears depth to 1.
    pub fn begin_depth_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, label: &str) -> wgpu::RenderPass<'e> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        pass
    }
}

/// Anything that provides a light-space depth texture for shadow tests.
pub trait DepthSource {
    fn light_view(&self) -> Mat4;
    fn light_projection(&self) -> Mat4;
    fn depth_view(&self) -> &wgpu::TextureView;
    fn texture_size(&self) -> u32;

    fn depth_bias_pv(&self) -> Mat4 {
        depth_bias_pv(self.light_view(), self.light_projection())
    }
}

/// Shadow map tuning.
#[derive(Debug, Clone, Copy)]
pub struct ShadowSettings {
    pub size: u32,
    /// Half width of the orthographic light frustum in world units.
    pub half_extent: f32,
    /// Eye distance from the focus; the frustum is twice as deep.
    pub depth_range: f32,
    pub bias: f32,
    pub enabled: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            size: 4096,
            half_extent: 60.0,
            depth_range: 150.0,
            bias: crate::shader::DEFAULT_SHADOW_BIAS,
            enabled: true,
        }
    }
}

/// Depth-only frame buffer that follows a focus point from a fixed light direction.
pub struct ShadowMap {
    framebuffer: FrameBuffer,
    settings: ShadowSettings,
    towards_light: Vec3,
    matrices: Option<(Mat4, Mat4)>,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, settings: ShadowSettings, towards_light: Vec3) -> Self {
        let size = settings.size.clamp(1, device.limits().max_texture_dimension_2d);
        if size != settings.size {
            log::warn!("Shadow map size {} exceeds device limit, using {size}", settings.size);
        }
        Self {
            framebuffer: FrameBuffer::depth_only(device, size, size, "Shadow Map"),
            settings: ShadowSettings { size, ..settings },
            towards_light,
            matrices: None,
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn set_light_direction(&mut self, towards_light: Vec3) {
        self.towards_light = towards_light;
    }

    /// Recompute the light matrices around `focus`.
    pub fn update(&mut self, focus: Vec3) {
        self.matrices = Some(light_space(
            self.towards_light,
            focus,
            self.settings.half_extent,
            self.settings.depth_range,
            self.settings.size,
        ));
    }

    /// Recompute the matrices around `focus` and begin the depth pass into the map.
    pub fn bind<'e>(&mut self, encoder: &'e mut wgpu::CommandEncoder, focus: Vec3) -> wgpu::RenderPass<'e> {
        self.update(focus);
        self.framebuffer.begin_depth_pass(encoder, "Shadow Depth Pass")
    }

    /// Comparison sampler for the shadow test.
    pub fn depth_sampler(&self) -> &wgpu::Sampler {
        &self.framebuffer.depth().sampler
    }

    pub fn is_bound_once(&self) -> bool {
        self.matrices.is_some()
    }

    fn matrices(&self) -> (Mat4, Mat4) {
        match self.matrices {
            Some(matrices) => matrices,
            None => {
                log::debug!("Shadow map matrices queried before the first bind");
                (Mat4::IDENTITY, Mat4::IDENTITY)
            }
        }
    }
}

impl DepthSource for ShadowMap {
    fn light_view(&self) -> Mat4 {
        self.matrices().0
    }

    fn light_projection(&self) -> Mat4 {
        self.matrices().1
    }

    fn depth_view(&self) -> &wgpu::TextureView {
        &self.framebuffer.depth().view
    }

    fn texture_size(&self) -> u32 {
        self.settings.size
    }
}

impl UniformLoader<ViewUniform> for ShadowMap {
    fn load_into(&self, uniform: &mut ViewUniform) {
        uniform.depth_bias_pv = self.depth_bias_pv().to_cols_array_2d();
        let enabled = self.settings.enabled && self.is_bound_once();
        uniform.shadow = [
            if enabled { 1.0 } else { 0.0 },
            self.settings.bias,
            self.settings.size as f32,
            0.0,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const SUN: Vec3 = Vec3::new(-25.0, 50.0, 60.0);

    fn to_texture(view: Mat4, projection: Mat4, p: Vec3) -> Vec3 {
        let v = depth_bias_pv(view, projection) * p.extend(1.0);
        v.truncate() / v.w
    }

    #[test]
    fn bias_maps_clip_corners_to_texture_corners() {
        let top_left = DEPTH_BIAS * Vec4::new(-1.0, 1.0, 0.0, 1.0);
        let bottom_right = DEPTH_BIAS * Vec4::new(1.0, -1.0, 1.0, 1.0);
        assert_eq!(top_left, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(bottom_right, Vec4::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn points_in_the_light_frustum_land_in_unit_cube() {
        let focus = Vec3::new(120.0, 4.0, -35.0);
        let (view, projection) = light_space(SUN, focus, 60.0, 150.0, 4096);
        for offset in [
            Vec3::ZERO,
            Vec3::new(30.0, 0.0, 30.0),
            Vec3::new(-40.0, 10.0, 20.0),
            Vec3::new(25.0, -5.0, -45.0),
        ] {
            let t = to_texture(view, projection, focus + offset);
            for c in t.to_array() {
                assert!((0.0..=1.0).contains(&c), "{offset} -> {t}");
            }
        }
    }

    #[test]
    fn focus_stays_centred() {
        let focus = Vec3::new(-73.3, 2.0, 18.9);
        let (view, projection) = light_space(SUN, focus, 60.0, 150.0, 4096);
        let t = to_texture(view, projection, focus);
        // Snapping moves the centre by at most half a texel.
        let half_texel = 0.5 / 4096.0 + 1e-5;
        assert!((t.x - 0.5).abs() <= half_texel, "{t}");
        assert!((t.y - 0.5).abs() <= half_texel, "{t}");
        assert!((t.z - 0.5).abs() < 1e-3, "{t}");
    }

    #[test]
    fn straight_down_light_has_a_valid_basis() {
        let (view, projection) = light_space(Vec3::Y, Vec3::ZERO, 10.0, 20.0, 512);
        assert!(view.is_finite());
        let t = to_texture(view, projection, Vec3::new(5.0, 0.0, 5.0));
        assert!(t.x > 0.0 && t.x < 1.0 && t.y > 0.0 && t.y < 1.0);
    }
}
