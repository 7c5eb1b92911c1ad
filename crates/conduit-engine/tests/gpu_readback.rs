//! Render → readback round trips on a real adapter.
//!
//! Every test skips (passes with a note on stderr) when the machine has no
//! usable adapter, so CI without a GPU stays green.

use conduit_engine::device::{DeviceContext, DeviceInit};
use conduit_engine::scene::{DEFAULT_CLEAR, TriangleScene};
use conduit_engine::texture::PixelFormat;
use conduit_engine::{Graphics, GraphicsConfig, wgpu};

fn adapter_available() -> bool {
    match DeviceContext::init(DeviceInit::default()) {
        Ok(_) => true,
        Err(err) => {
            eprintln!("skipping: no GPU adapter ({err:#})");
            false
        }
    }
}

fn dominant(px: [u8; 4]) -> usize {
    (0..3).max_by_key(|&c| px[c]).unwrap_or(0)
}

#[test]
fn triangle_round_trip() {
    if !adapter_available() {
        return;
    }

    let g = Graphics::new(GraphicsConfig::default());
    g.initialize(4, 4).unwrap();

    let image = g.render_frame_to_image().unwrap();
    assert_eq!((image.width(), image.height()), (4, 4));

    // Background: clear colour 0.2 grey.
    assert_eq!(image.pixel(0, 0), Some([51, 51, 51, 255]));
    assert_eq!(image.pixel(3, 0), Some([51, 51, 51, 255]));

    // Bottom corners sit next to the green and blue vertices.
    assert_eq!(dominant(image.pixel(0, 3).unwrap()), 1);
    assert_eq!(dominant(image.pixel(3, 3).unwrap()), 2);

    // Upper-middle pixels are closest to the red apex.
    assert_eq!(dominant(image.pixel(1, 1).unwrap()), 0);
    assert_eq!(dominant(image.pixel(2, 1).unwrap()), 0);

    g.shutdown();
}

#[test]
fn resize_then_read_matches_new_size() {
    if !adapter_available() {
        return;
    }

    let g = Graphics::new(GraphicsConfig::default());
    g.initialize(100, 100).unwrap();

    let image = g.render_frame_to_image().unwrap();
    assert_eq!((image.width(), image.height()), (100, 100));
    // 100 px rows are padded to 512 bytes on the GPU side; corners must
    // still land on the background.
    assert_eq!(image.pixel(0, 0), Some([51, 51, 51, 255]));
    assert_eq!(image.pixel(99, 99), Some([51, 51, 51, 255]));

    g.resize(50, 200);
    let image = g.render_frame_to_image().unwrap();
    assert_eq!((image.width(), image.height()), (50, 200));
    assert_eq!(image.pixels().len(), 50 * 200 * 4);

    g.shutdown();
}

#[test]
fn shutdown_stops_frames() {
    if !adapter_available() {
        return;
    }

    let g = Graphics::new(GraphicsConfig::default());
    g.initialize(8, 8).unwrap();
    assert!(g.render_frame_to_image().is_some());

    g.shutdown();
    assert!(!g.is_initialized());
    assert!(g.render_frame_to_image().is_none());
    g.shutdown();
}

#[test]
fn shared_texture_matches_target() {
    if !adapter_available() {
        return;
    }

    let g = Graphics::new(GraphicsConfig::default());
    g.initialize(16, 8).unwrap();

    let size = g.with_shared_texture(|shared| {
        let extent = shared.texture.size();
        (shared.width, shared.height, extent.width, extent.height)
    });
    assert_eq!(size, Some((16, 8, 16, 8)));
}

#[test]
fn invalid_shader_is_an_error() {
    if !adapter_available() {
        return;
    }

    let ctx = DeviceContext::init(DeviceInit::default()).unwrap();
    let err = ctx
        .load_shader("@vertex fn vs_main() -> vec4<f32> { return 1; }", "broken")
        .unwrap_err();
    assert!(format!("{err:#}").contains("broken"));
}

#[test]
fn mismatched_stages_fail_pipeline_creation() {
    if !adapter_available() {
        return;
    }

    // Both stages compile on their own; the fragment input at location 3 is
    // never written by the vertex stage.
    let vertex = include_str!("../src/scene/shaders/triangle_vs.wgsl");
    let fragment = "@fragment fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> { return tint; }";

    let ctx = DeviceContext::init(DeviceInit::default()).unwrap();
    let result = TriangleScene::with_shaders(&ctx, vertex, fragment, PixelFormat::Rgba8Unorm, DEFAULT_CLEAR);
    let err = match result {
        Ok(_) => panic!("pipeline with unmatched fragment input was accepted"),
        Err(err) => err,
    };
    assert!(format!("{err:#}").contains("triangle pipeline"), "{err:#}");
}

#[test]
fn rejected_texture_is_an_error() {
    if !adapter_available() {
        return;
    }

    let ctx = DeviceContext::init(DeviceInit::default()).unwrap();
    let result = ctx.validated("usage-less texture", |device| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::empty(),
            view_formats: &[],
        })
    });
    assert!(result.is_err());

    // The scope is popped; later valid work is unaffected.
    let scene = TriangleScene::new(&ctx, PixelFormat::Rgba8Unorm, DEFAULT_CLEAR);
    assert!(scene.is_ok());
}
