use bevy::prelude::*;
use convolution_surfaces::{
    ConvolutionSurfacePlugin,
    plugin::{ConvolutionSet, SurfaceContour},
    skeleton::{BoneId, Skeleton},
    types::Point,
};

/// Half the size of the default 150 × 150 grid, used to centre it on the camera.
const HALF_GRID: f32 = 75.0;

#[derive(Resource)]
struct Swinging(BoneId);

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, ConvolutionSurfacePlugin::default()))
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                swing.before(ConvolutionSet::Accumulate),
                draw.after(ConvolutionSet::Extract),
            ),
        )
        .run();
}

fn setup(mut commands: Commands, mut skeleton: ResMut<Skeleton>) {
    bevy::log::info!("Capsule Example");

    commands.spawn((Camera2d, Transform::from_scale(Vec3::splat(0.25))));

    let hip = skeleton.add_bone(Point::new(75.0, 90.0));
    let knee = skeleton.add_bone_with_radius(Point::new(75.0, 55.0), 8.0);
    let foot = skeleton.add_bone_with_radius(Point::new(110.0, 40.0), 3.0);

    skeleton.add_segment(hip, knee).expect("bones are live");
    skeleton.add_segment(knee, foot).expect("bones are live");

    commands.insert_resource(Swinging(foot));
}

fn swing(time: Res<Time>, swinging: Res<Swinging>, mut skeleton: ResMut<Skeleton>) {
    let angle = time.elapsed_secs_f64().sin() * 0.8;
    let position = Point::new(75.0 + 40.0 * angle.cos(), 55.0 - 40.0 * angle.sin());
    if let Err(err) = skeleton.move_bone(swinging.0, position) {
        bevy::log::warn!("{err}");
    }
}

fn draw(mut gizmos: Gizmos, contour: Res<SurfaceContour>, skeleton: Res<Skeleton>) {
    // Grid space has y pointing down; the screen has it pointing up.
    let to_screen = |p: Point| Vec2::new(p.x as f32 - HALF_GRID, HALF_GRID - p.y as f32);

    for segment in &contour.0.segments {
        gizmos.line_2d(
            to_screen(segment.start),
            to_screen(segment.end),
            Color::srgb(1.0, 0.0, 0.0),
        );
    }

    for (a, b) in skeleton.resolved_segments() {
        gizmos.line_2d(
            to_screen(a.position),
            to_screen(b.position),
            Color::WHITE,
        );
    }
}
