use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba};
use score_sorter::OrganizerError;
use score_sorter::annotate::font::{FontChoice, FontResolver, default_font_candidates};
use score_sorter::annotate::{AnnotationRequest, Annotator, MAX_FONT_SIZE, Position};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn fallback_annotator() -> Annotator {
    let annotator = Annotator::new(FontResolver::new(vec!["/nonexistent/font.ttf".into()]));
    assert!(annotator.font_choice().is_fallback());
    annotator
}

fn white_image(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
}

fn red_request(font_size: i32, position: Position) -> AnnotationRequest {
    AnnotationRequest {
        text_color: RED,
        background_color: Rgba([0, 0, 0, 128]),
        ..AnnotationRequest::new(7, font_size, position)
    }
}

/// Bounding box (x0, y0, x1, y1) of strongly red pixels.
fn red_bbox(img: &DynamicImage) -> Option<(u32, u32, u32, u32)> {
    let rgb = img.to_rgb8();
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in rgb.enumerate_pixels() {
        if p[0] as i32 - p[1] as i32 > 100 {
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bbox
}

/// Bounding box of every pixel that differs from white.
fn changed_bbox(img: &DynamicImage) -> Option<(u32, u32, u32, u32)> {
    let rgb = img.to_rgb8();
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in rgb.enumerate_pixels() {
        if p.0 != [255, 255, 255] {
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bbox
}

#[test]
fn fallback_label_grows_with_font_size() {
    let annotator = fallback_annotator();
    let img = white_image(400, 300);

    let small = annotator.annotate(&img, &red_request(20, Position::TopLeft)).expect("annotate");
    let large = annotator.annotate(&img, &red_request(80, Position::TopLeft)).expect("annotate");

    let (_, sy0, _, sy1) = red_bbox(&small).expect("small label drawn");
    let (_, ly0, _, ly1) = red_bbox(&large).expect("large label drawn");
    let small_h = sy1 - sy0 + 1;
    let large_h = ly1 - ly0 + 1;
    assert!(
        large_h >= 3 * small_h,
        "label height {large_h} at size 80 should be at least 3x {small_h} at size 20"
    );
}

#[test]
fn fallback_plate_matches_scaled_label_plus_padding() {
    let annotator = fallback_annotator();
    let img = white_image(300, 200);
    let request = red_request(22, Position::TopLeft);

    let label = annotator.render_label(&request).expect("label");
    assert_eq!(label.height(), 22);

    let out = annotator.annotate(&img, &request).expect("annotate");
    let p = annotator.padding();
    let (x0, y0, x1, y1) = changed_bbox(&out).expect("plate drawn");
    assert_eq!((x0, y0), (p, p));
    assert_eq!(x1 - x0 + 1, label.width() + 2 * p);
    assert_eq!(y1 - y0 + 1, label.height() + 2 * p);
}

#[test]
fn plate_lands_in_requested_corner() {
    let annotator = fallback_annotator();
    let (w, h) = (240, 160);
    let img = white_image(w, h);
    let p = annotator.padding();

    for position in [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ] {
        let out = annotator.annotate(&img, &red_request(16, position)).expect("annotate");
        let (x0, y0, x1, y1) = changed_bbox(&out).expect("plate drawn");
        match position {
            Position::TopLeft => assert_eq!((x0, y0), (p, p)),
            Position::TopRight => assert_eq!((x1, y0), (w - p - 1, p)),
            Position::BottomLeft => assert_eq!((x0, y1), (p, h - p - 1)),
            Position::BottomRight => assert_eq!((x1, y1), (w - p - 1, h - p - 1)),
        }
    }
}

#[test]
fn annotating_leaves_input_untouched() {
    let annotator = fallback_annotator();
    let img = white_image(120, 80);
    let before = img.clone();

    let out = annotator.annotate(&img, &red_request(30, Position::BottomRight)).expect("annotate");
    assert_eq!(img, before);
    assert_ne!(out, before);
    assert_eq!(out.dimensions(), before.dimensions());
    assert_eq!(out.color(), before.color());
}

#[test]
fn output_keeps_grayscale_mode() {
    let annotator = fallback_annotator();
    let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(64, 64, image::Luma([200])));
    let out = annotator.annotate(&gray, &red_request(12, Position::TopLeft)).expect("annotate");
    assert_eq!(out.color(), image::ColorType::L8);
}

#[test]
fn rejects_out_of_range_font_size() {
    let annotator = fallback_annotator();
    let img = white_image(50, 50);
    for size in [0, -4, MAX_FONT_SIZE + 1, 1_000_000] {
        let err = annotator.annotate(&img, &red_request(size, Position::TopLeft)).unwrap_err();
        assert!(matches!(err, OrganizerError::InvalidFontSize(s) if s == size));
    }
}

#[test]
fn rejects_empty_images() {
    let annotator = fallback_annotator();
    let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
    let err = annotator.annotate(&empty, &red_request(12, Position::TopLeft)).unwrap_err();
    assert!(matches!(err, OrganizerError::UnsupportedImage(_)));
}

#[test]
fn oversized_label_is_clipped_not_rejected() {
    let annotator = fallback_annotator();
    let img = white_image(20, 20);
    let out = annotator.annotate(&img, &red_request(64, Position::BottomRight)).expect("annotate");
    assert_eq!(out.dimensions(), (20, 20));
}

#[test]
fn largest_font_size_still_renders() {
    let annotator = fallback_annotator();
    let label = annotator
        .render_label(&red_request(MAX_FONT_SIZE, Position::TopLeft))
        .expect("label");
    assert_eq!(label.height(), MAX_FONT_SIZE as u32);
}

#[test]
fn scalable_font_honors_requested_size_when_available() {
    let installed: Vec<_> = default_font_candidates().into_iter().filter(|p| p.is_file()).collect();
    let annotator = Annotator::new(FontResolver::system_default());
    let FontChoice::Scalable { source, .. } = annotator.font_choice() else {
        assert!(
            installed.is_empty(),
            "fonts {installed:?} are installed but none loaded as scalable"
        );
        eprintln!("no system font installed; scalable path covered by the ignored test below");
        return;
    };
    eprintln!("scalable font: {}", source.display());

    let small = annotator.render_label(&red_request(20, Position::TopLeft)).expect("label");
    let large = annotator.render_label(&red_request(80, Position::TopLeft)).expect("label");
    assert!(small.height() > 0 && small.height() <= 20);
    assert!(large.height() >= 3 * small.height());
}

#[test]
#[ignore = "needs a TrueType font from the platform default list"]
fn scalable_plate_matches_label_plus_padding() {
    let annotator = Annotator::new(FontResolver::system_default());
    assert!(
        !annotator.font_choice().is_fallback(),
        "no scalable font among {:?}",
        default_font_candidates()
    );
    let img = white_image(300, 200);
    let request = red_request(40, Position::BottomRight);

    let label = annotator.render_label(&request).expect("label");
    assert!(label.height() > 0 && label.height() <= 40);

    let out = annotator.annotate(&img, &request).expect("annotate");
    let p = annotator.padding();
    let (x0, y0, x1, y1) = changed_bbox(&out).expect("plate drawn");
    assert_eq!((x1, y1), (300 - p - 1, 200 - p - 1));
    assert_eq!(x1 - x0 + 1, label.width() + 2 * p);
    assert_eq!(y1 - y0 + 1, label.height() + 2 * p);
}
