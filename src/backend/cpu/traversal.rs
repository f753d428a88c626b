use nalgebra::Unit;

use crate::geometry::{FloatType, HitRecord, Ray, RayIntersectionExt as _, intersect_sphere};

use super::decode::{KernelScene, KernelSphere};

/// Nearest hit found so far, as (distance, sphere index).
type Closest = Option<(FloatType, u32)>;

/// Equal distances resolve to the lower sphere index, so that the result
/// doesn't depend on the order in which spheres were visited.
fn update_closest(
    closest: &mut Closest,
    sphere: &KernelSphere,
    index: u32,
    ray: &Ray,
    t_min: FloatType,
    t_max: FloatType,
) {
    let Some(t) = intersect_sphere(&sphere.center, sphere.radius, ray, t_min, t_max) else {
        return;
    };

    let better = match *closest {
        None => true,
        Some((best_t, best_index)) => t < best_t || (t == best_t && index < best_index),
    };
    if better {
        *closest = Some((t, index));
    }
}

fn make_hit(scene: &KernelScene, ray: &Ray, closest: Closest) -> Option<HitRecord> {
    let (t, index) = closest?;
    let sphere = &scene.spheres[index as usize];

    let point = ray.point_at(t);
    let outward_normal = (point - sphere.center) / sphere.radius;
    let front_face = ray.direction.dot(&outward_normal) < 0.0;
    let normal = if front_face {
        outward_normal
    } else {
        -outward_normal
    };

    Some(HitRecord {
        t,
        point,
        normal: Unit::new_normalize(normal),
        front_face,
        sphere: index,
    })
}

/// Nearest hit by testing every sphere.
pub fn hit_brute_force(
    scene: &KernelScene,
    ray: &Ray,
    t_min: FloatType,
    t_max: FloatType,
) -> Option<HitRecord> {
    let mut closest = None;
    for (index, sphere) in scene.spheres.iter().enumerate() {
        update_closest(&mut closest, sphere, index as u32, ray, t_min, t_max);
    }
    make_hit(scene, ray, closest)
}

/// Nearest hit by walking the BVH with an explicit stack of node indices.
/// `stack` is only used as scratch space, to avoid allocating for every ray.
pub fn hit_bvh(
    scene: &KernelScene,
    ray: &Ray,
    t_min: FloatType,
    t_max: FloatType,
    stack: &mut Vec<u32>,
) -> Option<HitRecord> {
    let mut closest = None;

    stack.clear();
    stack.push(0);

    while let Some(node_index) = stack.pop() {
        let node = &scene.nodes[node_index as usize];
        let limit = closest.map_or(t_max, |(t, _)| t);
        if !node.bounds.is_hit(ray, t_min, limit) {
            continue;
        }

        if node.primitive_count == 0 {
            stack.push(node.left_or_first + 1);
            stack.push(node.left_or_first);
        } else {
            let first = node.left_or_first as usize;
            for slot in first..first + node.primitive_count as usize {
                let index = scene.indices[slot];
                let sphere = &scene.spheres[index as usize];
                update_closest(&mut closest, sphere, index, ray, t_min, t_max);
            }
        }
    }

    make_hit(scene, ray, closest)
}

/// Nearest hit using the traversal selected by the scene header.
pub fn hit(
    scene: &KernelScene,
    ray: &Ray,
    t_min: FloatType,
    t_max: FloatType,
    stack: &mut Vec<u32>,
) -> Option<HitRecord> {
    if scene.bvh_enabled {
        hit_bvh(scene, ray, t_min, t_max, stack)
    } else {
        hit_brute_force(scene, ray, t_min, t_max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::SphereBvh,
        geometry::{
            WorldPoint, WorldVector,
            test::{NonzeroWorldVectorWrapper, simple_float},
        },
        packing::{IndexEncoding, PackedScene},
        scene::{Color, Material, Scene, SceneParameters, Sphere, presets::Preset},
    };
    use assert2::{assert, let_assert};
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn kernel_scene(scene: &Scene) -> KernelScene {
        let bvh = SphereBvh::build(scene).unwrap();
        let camera = Preset::ThreeSpheres.camera(1.0);
        let packed = PackedScene::pack(
            scene,
            &bvh,
            &SceneParameters::default(),
            Some(&camera),
            IndexEncoding::Native,
        )
        .unwrap();
        KernelScene::decode(&packed).unwrap()
    }

    fn scene_strategy() -> impl Strategy<Value = Scene> {
        proptest::collection::vec(
            (
                simple_float(),
                simple_float(),
                simple_float(),
                1u32..5_000u32,
            ),
            1..100,
        )
        .prop_map(|spheres| {
            Scene::new(
                spheres
                    .into_iter()
                    .map(|(x, y, z, r)| {
                        Sphere::new(
                            WorldPoint::new(x * 0.1, y * 0.1, z * 0.1),
                            r as f32 * 1e-3,
                            Material::diffuse(Color::repeat(0.5)),
                        )
                    })
                    .collect(),
            )
            .unwrap()
        })
    }

    #[test]
    fn hits_nearest_sphere() {
        let scene = Preset::ThreeSpheres.scene().unwrap();
        let kernel = kernel_scene(&scene);
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, 5.0), WorldVector::new(0.0, 0.0, -1.0));

        let_assert!(Some(hit) = hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut Vec::new()));
        assert!(hit.sphere == 1);
        assert!((hit.t - 5.5).abs() < 1e-4);
        assert!(hit.front_face);
        assert!((hit.normal.into_inner() - WorldVector::new(0.0, 0.0, 1.0)).norm() < 1e-5);
    }

    #[test]
    fn hit_from_inside_flips_normal() {
        let scene = Scene::new(vec![Sphere::new(
            WorldPoint::origin(),
            2.0,
            Material::dielectric(Color::repeat(1.0), 1.5),
        )])
        .unwrap();
        let kernel = kernel_scene(&scene);
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(1.0, 0.0, 0.0));

        let_assert!(Some(hit) = hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY));
        assert!(!hit.front_face);
        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!(hit.normal.dot(&ray.direction) < 0.0);
    }

    #[test]
    fn miss_returns_none() {
        let scene = Preset::ThreeSpheres.scene().unwrap();
        let kernel = kernel_scene(&scene);
        let ray = Ray::new(WorldPoint::new(0.0, 0.0, 0.0), WorldVector::new(0.0, 1.0, 0.0));

        assert!(hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut Vec::new()).is_none());
        assert!(hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY).is_none());
    }

    #[test]
    fn coincident_spheres_pick_lowest_index() {
        let spheres = vec![
            Sphere::new(WorldPoint::new(5.0, 0.0, 0.0), 1.0, Material::diffuse(Color::zeros()));
            5
        ];
        let kernel = kernel_scene(&Scene::new(spheres).unwrap());
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(1.0, 0.0, 0.0));

        let_assert!(Some(hit) = hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut Vec::new()));
        assert!(hit.sphere == 0);
    }

    /// BVH traversal must find exactly the same nearest sphere as testing everything.
    #[proptest(ProptestConfig::with_cases(200))]
    fn bvh_matches_brute_force(
        #[strategy(scene_strategy())] scene: Scene,
        #[strategy(simple_float())] ox: f32,
        #[strategy(simple_float())] oy: f32,
        #[strategy(simple_float())] oz: f32,
        direction: NonzeroWorldVectorWrapper,
    ) {
        let kernel = kernel_scene(&scene);
        let ray = Ray::new(WorldPoint::new(ox, oy, oz) * 0.1, *direction);
        let mut stack = Vec::new();

        let bvh_hit = hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut stack);
        let brute_hit = hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY);

        assert!(bvh_hit.map(|h| h.sphere) == brute_hit.map(|h| h.sphere));
    }

    /// Same as above, but with rays aimed at a sphere so that most cases actually hit something.
    #[proptest(ProptestConfig::with_cases(200))]
    fn bvh_matches_brute_force_aimed(
        #[strategy(scene_strategy())] scene: Scene,
        #[strategy(simple_float())] ox: f32,
        #[strategy(simple_float())] oy: f32,
        #[strategy(simple_float())] oz: f32,
        target_selector: usize,
    ) {
        let kernel = kernel_scene(&scene);
        let origin = WorldPoint::new(ox, oy, oz);
        let target = scene.spheres()[target_selector % scene.len()].center;
        prop_assume!((target - origin).norm() > 1e-3);
        let ray = Ray::new(origin, target - origin);
        let mut stack = Vec::new();

        let bvh_hit = hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut stack);
        let brute_hit = hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY);

        assert!(brute_hit.is_some());
        assert!(bvh_hit.map(|h| h.sphere) == brute_hit.map(|h| h.sphere));
    }

    /// Rays from far away passing just inside or just outside the edge of a sphere's box.
    #[proptest(ProptestConfig::with_cases(500))]
    fn bvh_matches_brute_force_far_grazing(
        #[strategy(scene_strategy())] scene: Scene,
        target_selector: usize,
        #[strategy((-50i32..50).prop_filter("too close to the edge", |x| x.abs() >= 5))]
        edge_offset: i32,
        #[strategy(500u32..2000)] distance: u32,
        from_front: bool,
    ) {
        let kernel = kernel_scene(&scene);
        let target = &scene.spheres()[target_selector % scene.len()];
        let x = target.center.x + target.radius * (1.0 + edge_offset as f32 * 1e-3);
        let (z, direction) = if from_front {
            (distance as f32, -1.0)
        } else {
            (-(distance as f32), 1.0)
        };
        let ray = Ray::new(
            WorldPoint::new(x, target.center.y, z),
            WorldVector::new(0.0, 0.0, direction),
        );
        let mut stack = Vec::new();

        let bvh_hit = hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut stack);
        let brute_hit = hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY);

        if edge_offset < 0 {
            assert!(brute_hit.is_some());
        }
        assert!(bvh_hit.map(|h| h.sphere) == brute_hit.map(|h| h.sphere));
    }

    #[test]
    fn far_ray_just_outside_a_sphere_misses_it() {
        let spheres = vec![
            Sphere::new(WorldPoint::new(0.37, 0.0, 0.0), 1.0, Material::diffuse(Color::zeros())),
            Sphere::new(WorldPoint::new(-5.0, 3.0, 0.0), 0.5, Material::diffuse(Color::zeros())),
            Sphere::new(WorldPoint::new(-5.0, -3.0, 2.0), 0.5, Material::diffuse(Color::zeros())),
        ];
        let kernel = kernel_scene(&Scene::new(spheres).unwrap());
        let ray = Ray::new(WorldPoint::new(1.38, 0.0, 1000.0), WorldVector::new(0.0, 0.0, -1.0));

        assert!(hit_brute_force(&kernel, &ray, 0.001, FloatType::INFINITY).is_none());
        assert!(hit_bvh(&kernel, &ray, 0.001, FloatType::INFINITY, &mut Vec::new()).is_none());
    }
}
