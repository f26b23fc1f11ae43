use cuesheet_pipeline::table::{sniff_delimiter, Table};
use cuesheet_pipeline::{convert_bytes, ConvertError, ConvertOptions};
use serde_json::{json, Value};

const HEADER: &str = "record_type;video_id;line;start;end;key;is_global;country_scope;metadata;GBL;GBL";
const TWO_COUNTRIES: &str = "record_type;video_id;line;start;end;key;is_global;country_scope;metadata;FRA;GBL";

fn csv(header: &str, rows: &[&str]) -> String {
    let mut text = String::from(header);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

fn convert_with(text: &str, options: &ConvertOptions) -> Value {
    let output = convert_bytes(text.as_bytes(), options).expect("convert");
    serde_json::to_value(output).expect("to value")
}

fn convert(text: &str) -> Value {
    convert_with(text, &ConvertOptions::default())
}

fn video<'a>(doc: &'a Value, country: &str, video_id: &str) -> &'a Value {
    doc["byCountry"][country]["videos"]
        .as_array()
        .expect("videos")
        .iter()
        .find(|video| video["videoId"] == video_id)
        .unwrap_or_else(|| panic!("missing video {video_id}"))
}

#[test]
fn single_subtitle_row_produces_both_orientations() {
    let doc = convert(&csv(HEADER, &["sub;V1;1;00:00:01:00;00:00:02:00;;;;;Hello;"]));
    assert_eq!(doc["_multi"], json!(true));
    assert_eq!(doc["countries"], json!(["GBL"]));

    let landscape = video(&doc, "GBL", "V1_landscape");
    assert_eq!(
        landscape["subtitles"],
        json!([{ "line": 1, "in": 1.0, "out": 2.0, "text": "Hello" }])
    );
    assert_eq!(landscape["metadata"]["orientation"], json!("landscape"));

    let portrait = video(&doc, "GBL", "V1_portrait");
    assert_eq!(portrait["subtitles"][0]["text"], json!("Hello"));
    assert_eq!(portrait["metadata"]["orientation"], json!("portrait"));
}

#[test]
fn disclaimer_continuation_rows_merge_into_one_block() {
    let doc = convert(&csv(
        HEADER,
        &[
            "disclaimer;;;00:00:05:00;00:00:07:00;;;;;A;",
            "disclaimer;;;;;;;;;B;",
            "sub;V1;1;00:00:01:00;00:00:02:00;;;;;Hello;",
        ],
    ));
    let payload = &doc["byCountry"]["GBL"];
    assert_eq!(payload["disclaimer"]["landscape"], json!(["A\nB"]));
    assert_eq!(payload["disclaimer"]["portrait"], json!(["A\nB"]));

    let blocks = &video(&doc, "GBL", "V1_landscape")["disclaimer"];
    assert_eq!(
        blocks,
        &json!([{ "line": 1, "text": "A\nB", "in": 5.0, "out": 7.0 }])
    );
}

#[test]
fn non_contiguous_duplicate_subtitles_are_not_repeated() {
    let doc = convert(&csv(
        HEADER,
        &[
            "sub;V1;1;00:00:01:00;00:00:02:00;;;;;X;",
            "sub;V1;2;00:00:03:00;00:00:04:00;;;;;Y;",
            "sub;V1;1;00:00:01:00;00:00:02:00;;;;;X;",
        ],
    ));
    let subtitles = video(&doc, "GBL", "V1_landscape")["subtitles"]
        .as_array()
        .expect("subtitles")
        .clone();
    assert_eq!(subtitles.len(), 2);
    assert_eq!(subtitles[0]["line"], json!(1));
    assert_eq!(subtitles[0]["text"], json!("X"));
    assert_eq!(subtitles[1]["text"], json!("Y"));
}

#[test]
fn contiguous_continuation_lines_are_joined() {
    let doc = convert(&csv(
        HEADER,
        &[
            "sub;V1;1;00:00:01:00;00:00:02:00;;;;;first;",
            "sub;V1;1;;;;;;;second;",
            "sub;V1;2;00:00:03:00;00:00:04:00;;;;;third;",
        ],
    ));
    let subtitles = &video(&doc, "GBL", "V1_landscape")["subtitles"];
    assert_eq!(subtitles[0]["text"], json!("first\nsecond"));
    assert_eq!(subtitles[1]["text"], json!("third"));
}

#[test]
fn local_logo_anim_flag_overrides_duration_default() {
    let doc = convert(&csv(
        HEADER,
        &[
            "meta_global;;;;;logo_anim_flag;;30;Y;;",
            "meta_local;V;;;;duration;;;30;;",
            "meta_local;V;;;;logo_anim_flag;;;N;;",
            "meta_local;W;;;;duration;;;30;;",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hi;",
            "sub;W;1;00:00:01:00;00:00:02:00;;;;;Hi;",
        ],
    ));
    assert_eq!(video(&doc, "GBL", "V_landscape")["metadata"]["logo_anim_flag"], json!("N"));
    assert_eq!(video(&doc, "GBL", "W_landscape")["metadata"]["logo_anim_flag"], json!("Y"));
    assert_eq!(
        doc["byCountry"]["GBL"]["metadataGlobal"]["logo_anim_flag"],
        json!({ "30": "Y" })
    );
}

#[test]
fn per_country_flags_follow_precedence() {
    let doc = convert(&csv(
        TWO_COUNTRIES,
        &[
            "meta_global;;;;;disclaimer_flag;;;N;;Y",
            "meta_local;V;;;;disclaimer_flag;;;;;L",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Salut;Hello",
        ],
    ));
    assert_eq!(video(&doc, "GBL", "V_landscape")["metadata"]["disclaimer_flag"], json!("L"));
    assert_eq!(video(&doc, "FRA", "V_landscape")["metadata"]["disclaimer_flag"], json!("N"));
    assert_eq!(video(&doc, "FRA", "V_landscape")["subtitles"][0]["text"], json!("Salut"));
}

#[test]
fn country_order_follows_first_header_occurrence() {
    let header = "record_type;video_id;line;start;end;key;is_global;country_scope;metadata;FRA;GBL;FRA;GBL";
    let doc = convert(&csv(
        header,
        &["sub;V;1;00:00:01:00;00:00:02:00;;;;;fr;en;fr-p;en-p"],
    ));
    assert_eq!(doc["countries"], json!(["FRA", "GBL"]));
    assert_eq!(video(&doc, "GBL", "V_portrait")["subtitles"][0]["text"], json!("en-p"));
    assert_eq!(video(&doc, "FRA", "V_portrait")["subtitles"][0]["text"], json!("fr-p"));
}

#[test]
fn job_number_and_language_are_always_present() {
    let doc = convert(&csv(
        TWO_COUNTRIES,
        &[
            "meta_global;;;;;jobNumber;;;J0;;J1",
            "meta_global;;;;;language;;;;fr;en",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Salut;Hello",
        ],
    ));
    assert_eq!(doc["byCountry"]["FRA"]["metadataGlobal"]["jobNumber"], json!("J0"));
    assert_eq!(doc["byCountry"]["GBL"]["metadataGlobal"]["jobNumber"], json!("J1"));
    assert_eq!(doc["byCountry"]["GBL"]["metadataGlobal"]["language"], json!("en"));
    assert_eq!(doc["byCountry"]["GBL"]["metadataGlobal"]["country"], json!("GBL"));
    assert_eq!(doc["byCountry"]["GBL"]["metadataGlobal"]["schemaVersion"], json!("v2"));

    let bare = convert(&csv(HEADER, &["sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;"]));
    assert_eq!(bare["byCountry"]["GBL"]["metadataGlobal"]["jobNumber"], json!("noJobNumber"));
    assert_eq!(bare["byCountry"]["GBL"]["metadataGlobal"]["language"], json!(""));
}

#[test]
fn all_scope_broadcasts_first_text() {
    let doc = convert(&csv(
        TWO_COUNTRIES,
        &[
            "claim;;;;;;;ALL;;Shared;",
            "claim;;;;;;;;;Only FRA;",
        ],
    ));
    assert_eq!(doc["byCountry"]["GBL"]["claim"]["landscape"], json!(["Shared"]));
    assert_eq!(doc["byCountry"]["FRA"]["claim"]["landscape"], json!(["Shared", "Only FRA"]));
}

#[test]
fn metadata_casting_is_opt_in() {
    let rows = [
        "meta_global;;;;;budget;;;1.5;;",
        "meta_local;V;;;;duration;;;30;;",
        "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;",
    ];
    let plain = convert(&csv(HEADER, &rows));
    assert_eq!(video(&plain, "GBL", "V_landscape")["metadata"]["duration"], json!("30"));

    let options = ConvertOptions {
        cast_metadata: true,
        ..ConvertOptions::default()
    };
    let cast = convert_with(&csv(HEADER, &rows), &options);
    assert_eq!(video(&cast, "GBL", "V_landscape")["metadata"]["duration"], json!(30));
    assert_eq!(cast["byCountry"]["GBL"]["metadataGlobal"]["budget"], json!(1.5));
}

#[test]
fn join_claim_groups_rows_by_timing() {
    let rows = [
        "claim;;;00:00:01:00;00:00:02:00;;;;;A;",
        "claim;;;00:00:01:00;00:00:02:00;;;;;B;",
        "claim;;;00:00:03:00;00:00:04:00;;;;;C;",
    ];
    let options = ConvertOptions {
        join_claim: true,
        ..ConvertOptions::default()
    };
    let doc = convert_with(&csv(HEADER, &rows), &options);
    assert_eq!(doc["byCountry"]["GBL"]["claim"]["landscape"], json!(["A\nB", "C"]));

    let unjoined = convert(&csv(HEADER, &rows));
    assert_eq!(unjoined["byCountry"]["GBL"]["claim"]["landscape"], json!(["A", "B", "C"]));
}

#[test]
fn single_claim_gets_a_second_entry() {
    let doc = convert(&csv(
        HEADER,
        &[
            "claim;;;00:00:01:00;00:00:02:00;;;;;Only;",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;",
        ],
    ));
    let claims = &video(&doc, "GBL", "V_landscape")["claim"];
    assert_eq!(
        claims,
        &json!([
            { "line": 1, "text": "Only", "in": 1.0, "out": 2.0 },
            { "line": 2, "text": "Only", "in": 1.0, "out": 2.0 }
        ])
    );
}

#[test]
fn untimed_end_frame_serializes_null_times() {
    let doc = convert(&csv(
        HEADER,
        &[
            "endFrame;V;;;;;;;;END;",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;",
        ],
    ));
    assert_eq!(
        video(&doc, "GBL", "V_landscape")["endFrame"],
        json!([{ "line": 1, "text": "END", "in": null, "out": null }])
    );
}

#[test]
fn super_tracks_are_separate_from_subtitles() {
    let doc = convert(&csv(
        HEADER,
        &[
            "super_a;V;1;00:00:01:00;00:00:02:00;;;;;Top;",
            "super_b;V;1;00:00:03:00;00:00:04:00;;;;;Bottom;",
        ],
    ));
    let landscape = video(&doc, "GBL", "V_landscape");
    assert_eq!(landscape["subtitles"], json!([]));
    assert_eq!(landscape["super_A"][0]["text"], json!("Top"));
    assert_eq!(landscape["super_B"][0]["text"], json!("Bottom"));
}

#[test]
fn untimed_subtitles_are_dropped() {
    let doc = convert(&csv(
        HEADER,
        &[
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;kept;",
            "sub;V;2;;;;;;;orphan;",
        ],
    ));
    let subtitles = video(&doc, "GBL", "V_landscape")["subtitles"]
        .as_array()
        .expect("subtitles")
        .len();
    assert_eq!(subtitles, 1);
}

#[test]
fn no_orientation_flattens_top_level_arrays() {
    let options = ConvertOptions {
        no_orientation: true,
        ..ConvertOptions::default()
    };
    let doc = convert_with(&csv(HEADER, &["claim;;;;;;;;;Hi;"]), &options);
    assert_eq!(doc["byCountry"]["GBL"]["claim"], json!(["Hi"]));
    assert_eq!(doc["byCountry"]["GBL"]["disclaimer"], json!([""]));
}

#[test]
fn string_times_keep_trailing_zeros() {
    let options = ConvertOptions {
        times_as_string: true,
        ..ConvertOptions::default()
    };
    let doc = convert_with(
        &csv(HEADER, &["sub;V;1;00:00:01:00;00:00:02:12;;;;;Hello;"]),
        &options,
    );
    let subtitle = &video(&doc, "GBL", "V_landscape")["subtitles"][0];
    assert_eq!(subtitle["in"], json!("1.00"));
    assert_eq!(subtitle["out"], json!("2.48"));
}

#[test]
fn test_mode_prefixes_block_text_with_video_id() {
    let options = ConvertOptions {
        test_mode: true,
        ..ConvertOptions::default()
    };
    let doc = convert_with(
        &csv(
            HEADER,
            &[
                "logo;;;;;;;;;Brand;",
                "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;",
            ],
        ),
        &options,
    );
    assert_eq!(video(&doc, "GBL", "V_portrait")["logo"][0]["text"], json!("V_portrait_Brand"));
}

#[test]
fn invalid_timecode_aborts_conversion() {
    let text = csv(HEADER, &["sub;V;1;soon;00:00:02:00;;;;;Hello;"]);
    let err = convert_bytes(text.as_bytes(), &ConvertOptions::default()).unwrap_err();
    match err {
        ConvertError::Timecode { row, column, value, .. } => {
            assert_eq!(row, 1);
            assert_eq!(column, "start");
            assert_eq!(value, "soon");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_record_types_are_ignored() {
    let doc = convert(&csv(
        HEADER,
        &[
            "section;V;1;00:00:01:00;00:00:02:00;;;;;ignored;",
            "sub;V;1;00:00:01:00;00:00:02:00;;;;;Hello;",
        ],
    ));
    assert_eq!(doc["byCountry"]["GBL"]["videos"].as_array().expect("videos").len(), 2);
}

#[test]
fn simple_layout_converts_flat_subtitles() {
    let doc = convert("Start,End,Text\n00:00:01:00,00:00:02:00,Hi\n00:00:03:00,00:00:04:00,  \n");
    assert_eq!(
        doc,
        json!({ "subtitles": [{ "line": 1, "in": 1.0, "out": 2.0, "text": "Hi" }] })
    );
}

#[test]
fn simple_layout_rejects_bad_column_override() {
    let options = ConvertOptions {
        text_col: Some("9".to_string()),
        ..ConvertOptions::default()
    };
    let err = convert_bytes(b"start,end,text\n1,2,Hi\n", &options).unwrap_err();
    assert!(matches!(err, ConvertError::ColumnOverride(_)), "{err}");
}

#[test]
fn header_only_tables_convert_to_empty_subtitles() {
    assert_eq!(convert("section;foo;bar\n"), json!({ "subtitles": [] }));
    assert_eq!(convert(&csv(HEADER, &[])), json!({ "subtitles": [] }));
}

#[test]
fn sectioned_export_with_one_text_column_stays_flat() {
    let doc = convert(&csv(
        "subtitles;line;start;end;Text",
        &[
            ";1;00:00:01:00;00:00:02:00;Hello",
            ";2;00:00:02:00;00:00:03:00;World",
            "claim;1;00:00:04:00;00:00:05:00;Buy now",
            "disclaimer;;00:00:05:00;00:00:06:00;Terms apply",
            ";;;;no timing",
            "metadata;;;briefVersion;3",
        ],
    ));
    assert_eq!(
        doc,
        json!({
            "subtitles": [
                { "line": 1, "in": 1.0, "out": 2.0, "text": "Hello" },
                { "line": 2, "in": 2.0, "out": 3.0, "text": "World" }
            ],
            "claim": [{ "line": 1, "in": 4.0, "out": 5.0, "text": "Buy now" }],
            "disclaimer": [{ "line": 4, "in": 5.0, "out": 6.0, "text": "Terms apply" }],
            "disclaimer_02": [],
            "metadata": { "briefVersion": "3" }
        })
    );
}

#[test]
fn sectioned_country_row_names_text_columns() {
    let doc = convert(&csv(
        "section;line;start;end;Text;Text",
        &[
            "metadata;;;country;GBL;FRA",
            ";;;language;en;fr",
            "subtitles;1;00:00:01:00;00:00:02:00;Hello;Bonjour",
            ";2;00:00:02:00;00:00:03:00;Bye;",
            "disclaimer_02;;00:00:03:00;00:00:04:00;Small print;Petits caracteres",
        ],
    ));
    assert_eq!(doc["_multi"], json!(true));
    assert_eq!(doc["countries"], json!(["GBL", "FRA"]));
    let gbl = &doc["byCountry"]["GBL"];
    let fra = &doc["byCountry"]["FRA"];
    assert_eq!(gbl["subtitles"].as_array().expect("subtitles").len(), 2);
    assert_eq!(fra["subtitles"], json!([{ "line": 1, "in": 1.0, "out": 2.0, "text": "Bonjour" }]));
    assert_eq!(fra["disclaimer_02"][0]["line"], json!(3));
    assert_eq!(gbl["metadata"], json!({ "language": "en" }));
    assert_eq!(fra["metadata"], json!({ "language": "fr" }));
}

#[test]
fn sectioned_metadata_without_country_row_uses_column_placeholders() {
    let doc = convert(&csv(
        "metadata;line;start;end;Text;Text",
        &[
            ";;;briefVersion;1;2",
            ";;;;ignored;ignored",
            "subtitles;;00:00:01:00;00:00:02:00;A;B",
            "outro;;00:00:03:00;00:00:04:00;C;D",
        ],
    ));
    assert_eq!(doc["countries"], json!(["col1", "col2"]));
    assert_eq!(doc["byCountry"]["col1"]["metadata"], json!({ "briefVersion": "1" }));
    assert_eq!(doc["byCountry"]["col2"]["metadata"], json!({ "briefVersion": "2" }));
    assert_eq!(
        doc["byCountry"]["col2"]["subtitles"],
        json!([{ "line": 1, "in": 1.0, "out": 2.0, "text": "B" }])
    );
    assert_eq!(doc["byCountry"]["col1"]["claim"], json!([]));

    let empty = convert("claim;start;end;Text\nteaser;00:00:01:00;00:00:02:00;x\n");
    assert_eq!(
        empty,
        json!({ "subtitles": [], "claim": [], "disclaimer": [], "disclaimer_02": [], "metadata": {} })
    );
}

#[test]
fn sniffer_prefers_consistent_semicolons() {
    let sample = "record_type;video_id;note\nsub;V1;a, b\nsub;V2;c\n";
    assert_eq!(sniff_delimiter(sample), b';');
    let table = Table::parse(sample.as_bytes(), "utf-8", "auto").expect("table");
    assert_eq!(table.headers, vec!["record_type", "video_id", "note"]);
    assert_eq!(table.rows[0][2], "a, b");
}
