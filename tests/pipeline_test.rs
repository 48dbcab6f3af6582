use rand::{distributions::Alphanumeric, Rng};
use similar_asserts::assert_eq;
use studypack::{
    document::{Document, DocumentMetadata},
    document_configuration::{DocumentConfiguration, MarkupRules},
    markup::{Line, MarkupProcessor, Segment, SegmentStyle},
    measure::FixedAdvanceMetrics,
    paginate::Paginator,
    wrap::WordWrapper,
};

fn lay_out_lines(content: &str) -> Vec<Line> {
    let configuration = DocumentConfiguration::default();
    let metrics = FixedAdvanceMetrics::default();
    let lines = MarkupProcessor::new(&configuration.markup_rules).process(content);
    let wrapper = WordWrapper::new(
        &metrics,
        &configuration.typography,
        configuration.page_geometry.content_width(),
    );
    wrapper.wrap(&lines).unwrap()
}

fn lay_out_document(content: &str) -> Document {
    Document::lay_out(
        content,
        DocumentMetadata::default(),
        &DocumentConfiguration::default(),
        &FixedAdvanceMetrics::default(),
    )
    .unwrap()
}

fn random_word(rng: &mut impl Rng) -> String {
    let length = rng.gen_range(1..=14);
    rng.sample_iter(&Alphanumeric)
        .map(char::from)
        .take(length)
        .collect()
}

fn random_plain_content(rng: &mut impl Rng) -> String {
    (0..rng.gen_range(1..40))
        .map(|_| {
            if rng.gen_bool(0.1) {
                return String::new();
            }
            (0..rng.gen_range(1..60))
                .map(|_| random_word(rng))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn questions_scenario() {
    let lines = lay_out_lines("*QUESTIONS*\n*1.* What is 2+2?\nAnswer: 4");

    assert_eq!(
        lines,
        vec![
            Line::Text {
                segments: vec![Segment::bold("QUESTIONS")]
            },
            Line::Text {
                segments: vec![Segment::bold("1. "), Segment::plain("What is 2+2?")]
            },
            Line::Text {
                segments: vec![Segment::plain("Answer: 4")]
            },
        ]
    );
}

#[test]
fn two_items_joined_by_a_separator_share_one_page() {
    let separator = "-".repeat(40);
    let content = format!("Item A first\nItem A second\n{separator}\nItem B first\nItem B second");

    let document = lay_out_document(&content);

    assert_eq!(document.total_pages(), 1);
    assert_eq!(
        document.pages[0].lines,
        vec![
            Line::Text {
                segments: vec![Segment::plain("Item A first")]
            },
            Line::Text {
                segments: vec![Segment::plain("Item A second")]
            },
            Line::ItemSeparator,
            Line::Text {
                segments: vec![Segment::plain("Item B first")]
            },
            Line::Text {
                segments: vec![Segment::plain("Item B second")]
            },
        ]
    );
}

#[test]
fn a_separator_after_a_full_page_opens_the_next_page() {
    let separator = "-".repeat(40);
    let item = vec!["short line"; 32].join("\n");
    let content = format!("{item}\n{separator}\nnext item");

    let document = lay_out_document(&content);

    assert_eq!(document.total_pages(), 2);
    assert_eq!(document.pages[0].lines.len(), 32);
    assert_eq!(document.pages[1].lines[0], Line::ItemSeparator);
}

#[test]
fn plain_content_round_trips_through_wrapping() {
    let mut rng = rand::thread_rng();

    for _ in 0..20 {
        let content = random_plain_content(&mut rng);
        let lines = lay_out_lines(&content);

        assert!(lines.iter().all(|line| match line {
            Line::Text { segments } => segments
                .iter()
                .all(|segment| segment.style == SegmentStyle::Plain),
            Line::Divider | Line::ItemSeparator => false,
        }));
        let rejoined: String = lines.iter().map(Line::text).collect();
        assert_eq!(rejoined, content.replace('\n', ""));
    }
}

#[test]
fn wrapped_lines_fit_unless_they_hold_a_single_word() {
    let mut rng = rand::thread_rng();
    let metrics = FixedAdvanceMetrics::default();
    let configuration = DocumentConfiguration::default();

    for _ in 0..20 {
        for line in lay_out_lines(&random_plain_content(&mut rng)) {
            let text = line.text();
            // Plain text advances by 10 pixels per character with the default metrics
            let width = text.trim_end().chars().count() as f32
                * metrics.advance_ratio
                * configuration.typography.body_size;
            let word_count = text.split_whitespace().count();
            assert!(
                width <= configuration.page_geometry.content_width() || word_count == 1,
                "{:?} is {} pixels wide",
                text,
                width
            );
        }
    }
}

#[test]
fn dividers_precede_every_section_but_the_first_line() {
    let mut rng = rand::thread_rng();
    let rules = MarkupRules::default();

    for _ in 0..50 {
        let raw_lines: Vec<String> = (0..rng.gen_range(1..30))
            .map(|_| match rng.gen_range(0..5) {
                0 => "*QUESTIONS*".to_string(),
                1 => "*SOLUTIONS* (Section B)".to_string(),
                2 => "*TUTOR GUIDE*".to_string(),
                _ => random_word(&mut rng),
            })
            .collect();
        let lines = MarkupProcessor::new(&rules).process(&raw_lines.join("\n"));

        let triggers_after_the_first_line = raw_lines
            .iter()
            .skip(1)
            .filter(|raw_line| rules.is_divider_trigger(raw_line))
            .count();
        let dividers = lines.iter().filter(|line| **line == Line::Divider).count();
        assert_eq!(dividers, triggers_after_the_first_line);

        // Without fences or separators every raw line yields one text line, preceded by its divider
        let expected_dividers: Vec<bool> = raw_lines
            .iter()
            .enumerate()
            .flat_map(|(position, raw_line)| {
                if position > 0 && rules.is_divider_trigger(raw_line) {
                    vec![true, false]
                } else {
                    vec![false]
                }
            })
            .collect();
        let dividers_found: Vec<bool> = lines.iter().map(|line| *line == Line::Divider).collect();
        assert_eq!(dividers_found, expected_dividers);
    }
}

#[test]
fn code_lines_are_never_wrapped() {
    let code_line = format!("let x = \"{}\";  // *not bold*", "y".repeat(150));
    let content = format!("```\n{code_line}\n```");

    let lines = lay_out_lines(&content);

    assert_eq!(
        lines,
        vec![Line::Text {
            segments: vec![Segment::code(code_line)]
        }]
    );
}

#[test]
fn an_oversized_word_overflows_on_its_own_line() {
    let long_word = "x".repeat(100);
    let lines = lay_out_lines(&format!("before {long_word} after"));

    assert_eq!(
        lines.iter().map(Line::text).collect::<Vec<_>>(),
        vec!["before ".to_string(), format!("{long_word} "), "after".to_string()]
    );
}

#[test]
fn page_counts_follow_the_geometry() {
    let configuration = DocumentConfiguration::default();
    let paginator = Paginator::new(&configuration.page_geometry);
    let expected_lines_per_page = ((configuration.page_geometry.content_height())
        / configuration.page_geometry.line_height)
        .floor() as usize;
    assert_eq!(paginator.lines_per_page(), expected_lines_per_page);

    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let content = random_plain_content(&mut rng);
        let first = lay_out_document(&content);
        let second = lay_out_document(&content);

        let line_count = first.lines().count();
        assert_eq!(
            first.total_pages(),
            line_count.div_ceil(expected_lines_per_page).max(1)
        );
        assert!(first
            .pages
            .iter()
            .all(|page| page.lines.len() <= expected_lines_per_page));
        assert_eq!(first, second);
    }
}

#[test]
fn empty_content_yields_one_page() {
    let document = lay_out_document("");

    assert_eq!(document.total_pages(), 1);
    assert_eq!(document.pages[0].index, 0);
}
