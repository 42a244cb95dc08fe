// tests/test_image.rs — Integration tests for Image<T> and ImageView.
//
// Integration tests only see the public API, so these double as a check
// that the container is usable from outside the crate.

use retina_clahe::image::Image;

// ===== Construction & access =====

#[test]
fn image_new_zero_initialized() {
    let img: Image<u8> = Image::new(100, 50);
    assert_eq!(img.width(), 100);
    assert_eq!(img.height(), 50);
    assert_eq!(img.get(0, 0), 0);
    assert_eq!(img.get(99, 49), 0);
}

#[test]
fn image_set_get_consistency() {
    let mut img: Image<u8> = Image::new(10, 10);
    for y in 0..10 {
        for x in 0..10 {
            let val = if (x + y) % 2 == 0 { 255u8 } else { 0u8 };
            img.set(x, y, val);
        }
    }
    for y in 0..10 {
        for x in 0..10 {
            let expected = if (x + y) % 2 == 0 { 255u8 } else { 0u8 };
            assert_eq!(img.get(x, y), expected, "mismatch at ({x}, {y})");
        }
    }
}

#[test]
fn image_rows_are_packed() {
    // 3×2 image, row-major:
    //  [10, 20, 30]
    //  [40, 50, 60]
    let img = Image::from_vec(3, 2, vec![10u8, 20, 30, 40, 50, 60]);
    assert_eq!(img.row(0), &[10, 20, 30]);
    assert_eq!(img.row(1), &[40, 50, 60]);
    let rows: Vec<&[u8]> = img.as_slice().chunks(img.width()).collect();
    assert_eq!(rows[1], img.row(1));
}

// ===== Sub-image views =====

#[test]
fn sub_image_coordinates() {
    // 5×5 image with pixel value = x * 10 + y
    let img: Image<u8> = Image::from_fn(5, 5, |x, y| (x * 10 + y) as u8);

    // 3×3 view starting at (1, 2)
    let view = img.sub_image(1, 2, 3, 3);
    assert_eq!((view.width(), view.height()), (3, 3));
    // view(0,0) should be img(1,2) = 12
    assert_eq!(view.get(0, 0), 12);
    // view(2,2) should be img(3,4) = 34
    assert_eq!(view.get(2, 2), 34);
    assert_eq!(view.row(1), &[13, 23, 33]);
}

#[test]
fn sub_image_full_image() {
    let img: Image<u8> = Image::from_fn(4, 3, |x, y| (x + y * 4) as u8);
    let view = img.sub_image(0, 0, 4, 3);
    assert_eq!(view.to_owned_image(), img);
}

#[test]
fn into_vec_returns_buffer() {
    let img = Image::from_vec(2, 2, vec![1u8, 2, 3, 4]);
    assert_eq!(img.into_vec(), vec![1, 2, 3, 4]);
}

#[test]
fn f32_image_holds_normalized_values() {
    let mut img: Image<f32> = Image::new(3, 3);
    img.set(1, 1, 0.5);
    assert_eq!(img.get(1, 1), 0.5);
    assert_eq!(img.get(0, 0), 0.0);
}
