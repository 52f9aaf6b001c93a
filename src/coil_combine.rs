use log::debug;
use num_complex::Complex32;
use num_traits::Zero;
use rayon::prelude::*;
use crate::{ArrayDim, Error, Result};
use crate::dims::{pipeline_dims, pipeline_shape, require_pipeline, CHA, E1, E2, LOC, RO};
use crate::fft::{ifft2c, ifft3c};

#[cfg(test)]
mod tests {
    use num_complex::Complex32;
    use crate::dims::pipeline_dims;
    use crate::Error;
    use crate::coil_combine::*;
    use crate::fft::{fft2c, fft3c, ifft2c};

    fn assert_close(a:&[Complex32],b:&[Complex32],tol:f32) {
        assert_eq!(a.len(),b.len());
        for (i,(x,y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).norm() <= tol,"voxel {i}: {x} vs {y}");
        }
    }

    fn pseudo_random(dims:&crate::ArrayDim, seed:f32) -> Vec<Complex32> {
        (0..dims.numel()).map(|i| {
            let t = i as f32 + seed;
            Complex32::new((1.3 * t).sin(),(0.7 * t + 0.2).cos())
        }).collect()
    }

    #[test]
    fn single_channel_unit_map_is_plain_ifft() {
        let dims = pipeline_dims([8,6,1,1,2,1,1]);
        let kspace = pseudo_random(&dims,0.);
        let map = dims.alloc(Complex32::ONE);
        let (img,img_dims) = coil_combine(&kspace,&dims,&map,&dims).unwrap();
        let mut expected = kspace.clone();
        ifft2c(&mut expected,&dims);
        assert_eq!(img_dims,dims);
        assert_close(&img,&expected,1e-5);
    }

    #[test]
    fn self_consistent_map_gives_sum_of_squares() {
        let dims = pipeline_dims([6,4,4,3,1,2,2]);
        let images = pseudo_random(&dims,1.5);
        let mut kspace = images.clone();
        fft3c(&mut kspace,&dims);
        let (combined,out_dims) = coil_combine(&kspace,&dims,&images,&dims).unwrap();
        assert_eq!(out_dims.shape_ns(),&[6,4,4,1,1,2,2]);
        let vol = 6 * 4 * 4;
        for (ii,out) in combined.chunks_exact(vol).enumerate() {
            for v in 0..vol {
                let sos:f32 = (0..3).map(|c| images[ii * 3 * vol + c * vol + v].norm_sqr()).sum();
                assert!((out[v].norm() - sos).abs() < 1e-3,"voxel {v} of volume {ii}");
            }
        }
    }

    #[test]
    fn two_dimensional_path_when_e2_is_singleton() {
        let dims = pipeline_dims([4,4,1,2,1,1,1]);
        let images = pseudo_random(&dims,3.);
        let mut kspace = images.clone();
        fft2c(&mut kspace,&dims);
        let (combined,_) = coil_combine(&kspace,&dims,&images,&dims).unwrap();
        for v in 0..16 {
            let sos = images[v].norm_sqr() + images[16 + v].norm_sqr();
            assert!((combined[v].re - sos).abs() < 1e-4);
            assert!(combined[v].im.abs() < 1e-4);
        }
    }

    #[test]
    fn map_repetitions_are_clamped() {
        // three repetitions of image data, one map repetition
        let dims = pipeline_dims([2,2,1,2,3,1,1]);
        let map_dims = pipeline_dims([2,2,1,2,1,1,1]);
        let images = pseudo_random(&dims,0.5);
        let map = pseudo_random(&map_dims,4.);
        let combined = combine_images(&images,&dims,&map,&map_dims).unwrap();
        let vol = 4;
        for n in 0..3 {
            for v in 0..vol {
                let base = n * 2 * vol;
                let expected = images[base + v] * map[v].conj() + images[base + vol + v] * map[vol + v].conj();
                assert!((combined[n * vol + v] - expected).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn map_segments_are_clamped_per_slice() {
        let dims = pipeline_dims([2,1,1,1,1,3,2]);
        let map_dims = pipeline_dims([2,1,1,1,1,2,2]);
        let images = dims.alloc(Complex32::ONE);
        let map:Vec<Complex32> = (0..map_dims.numel()).map(|i| Complex32::new(i as f32,1.)).collect();
        let combined = combine_images(&images,&dims,&map,&map_dims).unwrap();
        // output volume (s, loc) takes map volume (min(s,1), loc)
        for loc in 0..2 {
            for s in 0..3 {
                let m = s.min(1) + 2 * loc;
                for ro in 0..2 {
                    assert_eq!(combined[ro + 2 * (s + 3 * loc)],map[ro + 2 * m].conj());
                }
            }
        }
    }

    #[test]
    fn mismatched_map_is_rejected() {
        let dims = pipeline_dims([4,4,1,2,1,1,1]);
        let map_dims = pipeline_dims([4,4,1,3,1,1,1]);
        let x = dims.alloc(Complex32::ONE);
        let map = map_dims.alloc(Complex32::ONE);
        assert!(matches!(coil_combine(&x,&dims,&map,&map_dims),Err(Error::CoilMapShape{..})));
    }

}

/// reconstruct single channel images from multi-channel k-space [RO,E1,E2,CHA,N,S,LOC].
/// k-space goes to image space with a centered inverse FFT (3-D when E2 > 1) and channels
/// are combined with the conjugate coil sensitivities. Returns [RO,E1,E2,1,N,S,LOC].
pub fn coil_combine(kspace:&[Complex32], kspace_dims:&ArrayDim, coil_map:&[Complex32], map_dims:&ArrayDim) -> Result<(Vec<Complex32>, ArrayDim)> {
    assert_eq!(kspace_dims.numel(),kspace.len(),"data buffer and array dims must be consistent");
    check_map_dims(kspace_dims,map_dims)?;

    let mut images = kspace.to_vec();
    if kspace_dims.size(E2) > 1 {
        ifft3c(&mut images,kspace_dims);
    } else {
        ifft2c(&mut images,kspace_dims);
    }

    let combined = combine_images(&images,kspace_dims,coil_map,map_dims)?;
    let [ro,e1,e2,_,n,s,loc] = pipeline_shape(kspace_dims);
    Ok((combined,pipeline_dims([ro,e1,e2,1,n,s,loc])))
}

/// combine multi-channel images with a coil map: sum over channels of image * conj(map).
/// Map repetitions and segments beyond their extent reuse the last available map volume.
pub fn combine_images(images:&[Complex32], image_dims:&ArrayDim, coil_map:&[Complex32], map_dims:&ArrayDim) -> Result<Vec<Complex32>> {
    assert_eq!(image_dims.numel(),images.len(),"data buffer and array dims must be consistent");
    assert_eq!(map_dims.numel(),coil_map.len(),"coil map buffer and dims must be consistent");
    check_map_dims(image_dims,map_dims)?;

    let [ro,e1,e2,cha,n,s,loc] = pipeline_shape(image_dims);
    let [_,_,_,_,map_n,map_s,_] = pipeline_shape(map_dims);
    let vol = ro * e1 * e2;
    let n_vols = n * s * loc;
    debug!("combining {cha} channels over {n_vols} volumes of {:?}",[ro,e1,e2]);

    let mut combined = vec![Complex32::zero(); vol * n_vols];

    // each output volume is owned by exactly one task
    combined.par_chunks_exact_mut(vol).enumerate().for_each(|(ii,out)| {
        let i_loc = ii / (n * s);
        let i_s = (ii - i_loc * n * s) / n;
        let i_n = ii - i_loc * n * s - i_s * n;

        let map_n_idx = i_n.min(map_n - 1);
        let map_s_idx = i_s.min(map_s - 1);

        let img_start = image_dims.calc_addr(&[0,0,0,0,i_n,i_s,i_loc]);
        let map_start = map_dims.calc_addr(&[0,0,0,0,map_n_idx,map_s_idx,i_loc]);

        for c in 0..cha {
            let img = &images[img_start + c * vol..img_start + (c + 1) * vol];
            let map = &coil_map[map_start + c * vol..map_start + (c + 1) * vol];
            out.iter_mut().zip(img.iter().zip(map)).for_each(|(o,(x,m))| {
                *o += x * m.conj();
            });
        }
    });

    Ok(combined)
}

fn check_map_dims(image_dims:&ArrayDim, map_dims:&ArrayDim) -> Result<()> {
    let image_dims = require_pipeline(image_dims)?;
    let map_dims = require_pipeline(map_dims)?;
    let agree = [RO,E1,E2,CHA,LOC].iter().all(|&ax| image_dims.size(ax) == map_dims.size(ax));
    if !agree {
        return Err(Error::CoilMapShape {
            image: image_dims.shape_ns().to_vec(),
            map: map_dims.shape_ns().to_vec(),
        });
    }
    Ok(())
}
