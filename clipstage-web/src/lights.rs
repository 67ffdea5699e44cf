use clipstage_gpu_shared::uniforms::LightUniforms;
use glam::Vec3;

use crate::config::LightsConfig;

fn premultiplied(color: [f32; 3], intensity: f32) -> [f32; 4] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity, 1.0]
}

fn aim(position: [f32; 3], target: [f32; 3]) -> Vec3 {
    (Vec3::from_array(target) - Vec3::from_array(position))
        .try_normalize()
        .unwrap_or(Vec3::NEG_Y)
}

/// Pack the studio lights for the shader. The spot's inner cone shrinks
/// from the outer one by the penumbra fraction; the area light becomes a
/// directional fill along its aim.
pub fn light_uniforms(config: &LightsConfig) -> LightUniforms {
    let spot = &config.spot;
    let outer = spot.angle;
    let inner = outer * (1.0 - spot.penumbra.clamp(0.0, 1.0));

    LightUniforms {
        ambient: premultiplied(config.ambient.color, config.ambient.intensity),
        point_position: Vec3::from_array(config.point.position).extend(1.0).to_array(),
        point_color: premultiplied(config.point.color, config.point.intensity),
        spot_position: Vec3::from_array(spot.position).extend(outer.cos()).to_array(),
        spot_direction: aim(spot.position, spot.target).extend(inner.cos()).to_array(),
        spot_color: premultiplied(spot.color, spot.intensity),
        fill_direction: aim(config.area.position, config.area.target).extend(0.0).to_array(),
        fill_color: premultiplied(config.area.color, config.area.intensity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_default_studio_lights() {
        let lights = light_uniforms(&LightsConfig::default());
        assert_eq!(lights.ambient, [1.0, 1.0, 1.0, 1.0]);
        assert!(approx_eq(lights.point_color[0], 0.15));
        assert_eq!(&lights.point_position[..3], &[0.0, 0.08, 0.1]);
        // Area light straight above the origin shines down
        assert_eq!(&lights.fill_direction[..3], &[0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_spot_cone_angles() {
        let lights = light_uniforms(&LightsConfig::default());
        let outer = std::f32::consts::FRAC_PI_6;
        assert!(approx_eq(lights.spot_position[3], outer.cos()));
        assert!(approx_eq(lights.spot_direction[3], (outer * 0.7).cos()));
        assert!(lights.spot_direction[3] > lights.spot_position[3], "inner cone is narrower");
        let dir = Vec3::new(lights.spot_direction[0], lights.spot_direction[1], lights.spot_direction[2]);
        assert!(approx_eq(dir.length(), 1.0));
        assert!(dir.z < 0.0, "spot at +Z aims back at the origin");
    }

    #[test]
    fn test_degenerate_aim_points_down() {
        let mut config = LightsConfig::default();
        config.area.target = config.area.position;
        assert_eq!(&light_uniforms(&config).fill_direction[..3], &[0.0, -1.0, 0.0]);
    }
}
