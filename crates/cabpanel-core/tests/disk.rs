use cabpanel_core::prelude::*;
use image::RgbaImage;
use pretty_assertions::assert_eq;

#[test]
fn test_windows_panel_compiles_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let train = dir.path().join("train");
    std::fs::create_dir_all(train.join("Img")).unwrap();
    RgbaImage::new(20, 10).save(train.join("Img").join("Lamp.gif")).unwrap();
    std::fs::write(
        train.join("panel2.cfg"),
        "[PilotLamp]\r\nSubject = ats8\r\nDaytimeImage = img\\lamp.gif\r\n",
    )
    .unwrap();

    let options = CompileOptions::default();
    let source = PanelSource::from_file(train.join("panel2.cfg"), options.encoding).unwrap();
    let mut textures = ImageHeaderTextures::default();
    let files = DiskFiles::new(dir.path().join("compat"));
    let mut sections = CarSections::new(1);
    let mut log = DiagnosticLog::default();
    let mut signal = CancelFlag::default();
    let outcome = {
        let mut ctx = LoadContext {
            textures: &mut textures,
            files: &files,
            sink: &mut sections,
            diagnostics: &mut log,
            signal: &mut signal,
        };
        compile_panel(&source, &options, &mut ctx)
    };

    assert!(log.is_empty(), "{:?}", log.entries);
    assert_eq!(outcome.elements_added, 1);
    assert_eq!(sections.elements(0)[0].kind, ElementKind::PilotLamp);

    let registered = textures.textures();
    assert_eq!(registered.len(), 1);
    assert!(registered[0].path.ends_with("Img/Lamp.gif"));
    assert_eq!((registered[0].width, registered[0].height), (20, 10));
}
