//! GPU textures: depth targets, colour images and cube maps.

use terrain::TextureData;
use wgpu::util::DeviceExt;

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment that can also be sampled with a comparison sampler.
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self { texture, view, sampler }
    }

    /// Colour render target of the given format, sampleable afterwards.
    pub fn create_render_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Self::sampler(device, wgpu::AddressMode::ClampToEdge, label);
        Self { texture, view, sampler }
    }

    fn sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode, label: &str) -> wgpu::Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }

    /// Upload an sRGB RGBA8 image. `repeat` selects wrapping or clamping.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        repeat: bool,
        label: &str,
    ) -> Self {
        Self::from_rgba_format(device, queue, width, height, rgba, repeat, wgpu::TextureFormat::Rgba8UnormSrgb, label)
    }

    #[allow(clippy::too_many_arguments)]
    fn from_rgba_format(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        repeat: bool,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mode = if repeat {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = Self::sampler(device, mode, label);
        Self { texture, view, sampler }
    }

    /// Upload procedural or loaded texture data as sRGB colour.
    pub fn from_data(device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData, repeat: bool, label: &str) -> Self {
        Self::from_rgba(device, queue, data.width, data.height, &data.to_bytes(), repeat, label)
    }

    /// Upload texture data as linear values (weights, masks).
    pub fn from_data_linear(device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData, label: &str) -> Self {
        Self::from_rgba_format(
            device,
            queue,
            data.width,
            data.height,
            &data.to_bytes(),
            false,
            wgpu::TextureFormat::Rgba8Unorm,
            label,
        )
    }

    /// 1x1 white texture for untextured materials.
    pub fn white_pixel(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba(device, queue, 1, 1, &[255, 255, 255, 255], true, "White Pixel")
    }

    /// Cube map from six equally sized square faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn cube_from_faces(device: &wgpu::Device, queue: &wgpu::Queue, faces: &[TextureData; 6], label: &str) -> Self {
        let size = faces[0].width;
        let mut bytes = Vec::with_capacity((size * size * 4 * 6) as usize);
        for face in faces {
            if face.width == size && face.height == size {
                bytes.extend(face.to_bytes());
            } else {
                log::warn!("{label}: cube face {}x{} does not match {size}x{size}, filling grey", face.width, face.height);
                bytes.extend(std::iter::repeat([128u8, 128, 128, 255]).take((size * size) as usize).flatten());
            }
        }
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &bytes,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = Self::sampler(device, wgpu::AddressMode::ClampToEdge, label);
        Self { texture, view, sampler }
    }
}
