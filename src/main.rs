//! USD property panel demo
//!
//! Opens an in-memory stage with two hashed mesh prims and edits both at
//! once through a property panel. Ctrl+Z undoes the last edit.

use std::rc::Rc;

use eframe::egui;
use glam::Vec3;
use usd_props::constants;
use usd_props::model::{AttributeBinding, AttributeNameModel, AttributeValueModel, ModelOptions};
use usd_props::model::{ItemValueModel, VirtualAttributeNameModel, VirtualAttributeValueModel};
use usd_props::path_utils;
use usd_props::stage::{AttributeSpec, AttributeValue, InMemoryStage, SdfPath, StageHandle, ValueKind};
use usd_props::{FilePickerWidget, PropertyConfig, PropertyPanel, StageError, Subscription, UsdListener};

const MESHES: [&str; 2] = [
    "/RootNode/meshes/mesh_0123456789ABCDEF",
    "/RootNode/meshes/mesh_FEDCBA9876543210",
];

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn build_demo_stage() -> Result<Rc<InMemoryStage>, StageError> {
    let stage = Rc::new(InMemoryStage::new());
    for (index, mesh) in MESHES.iter().enumerate() {
        stage.define_prim(*mesh);
        let attr = |name: &str| format!("{}.{}", mesh, name);

        stage.declare_attribute(
            attr("size"),
            AttributeSpec::new(ValueKind::Double).schema_default(AttributeValue::Double(1.0)),
        )?;
        stage.declare_attribute(attr("displayColor"), AttributeSpec::new(ValueKind::Color3f).display_name("Color"))?;
        stage.declare_attribute(attr("visible"), AttributeSpec::new(ValueKind::Bool).display_name("Visible"))?;
        stage.declare_attribute(
            attr("subdivisionScheme"),
            AttributeSpec::new(ValueKind::Int).display_name("Subdivision"),
        )?;
        stage.declare_attribute(
            attr("diffuseTexture"),
            AttributeSpec::new(ValueKind::Asset).color_space("sRGB").display_name("Diffuse"),
        )?;

        stage.set_attribute(attr("size"), AttributeValue::Double(5.0 + 2.0 * index as f64))?;
        stage.set_attribute(attr("displayColor"), AttributeValue::Color3f(Vec3::new(0.8, 0.2, 0.2)))?;
        stage.set_attribute(attr("visible"), AttributeValue::Bool(true))?;
    }
    Ok(stage)
}

struct PropertiesApp {
    stage: Rc<InMemoryStage>,
    listener: UsdListener,
    panel: PropertyPanel,
    picker: FilePickerWidget,
    _subscriptions: Vec<Subscription>,
}

impl PropertiesApp {
    fn new(config: PropertyConfig) -> AppResult<Self> {
        let stage = build_demo_stage()?;
        let handle: StageHandle = stage.clone();
        let listener = UsdListener::new(&config)?;
        let settings = ModelOptions::from_config(&config);
        let mut panel = PropertyPanel::new();

        let binding = |name: &str| {
            AttributeBinding::new(
                handle.clone(),
                "demo",
                MESHES.iter().map(|mesh| SdfPath::new(format!("{}.{}", mesh, name))).collect(),
            )
        };
        let name = |attr: &str| -> Rc<dyn ItemValueModel> {
            Rc::new(AttributeNameModel::for_attribute(&handle, SdfPath::new(format!("{}.{}", MESHES[0], attr))))
        };

        let mut add_row = |attr: &str, models: Vec<Rc<AttributeValueModel>>| {
            let values = models
                .into_iter()
                .map(|model| {
                    listener.add_model(model.clone());
                    model as Rc<dyn ItemValueModel>
                })
                .collect();
            panel.add_row(name(attr), values);
        };

        add_row("size", vec![Rc::new(AttributeValueModel::new(binding("size"), settings.clone()))]);
        add_row(
            "displayColor",
            (0..3)
                .map(|channel| Rc::new(AttributeValueModel::new(binding("displayColor"), settings.clone().channel(channel))))
                .collect(),
        );
        add_row("visible", vec![Rc::new(AttributeValueModel::new(binding("visible"), settings.clone()))]);
        add_row(
            "subdivisionScheme",
            vec![Rc::new(AttributeValueModel::with_options(
                binding("subdivisionScheme"),
                vec!["catmullClark".to_string(), "loop".to_string(), "bilinear".to_string(), "none".to_string()],
                settings.clone(),
            ))],
        );
        add_row("diffuseTexture", vec![Rc::new(AttributeValueModel::new(binding("diffuseTexture"), settings.clone()))]);

        let roughness = Rc::new(VirtualAttributeValueModel::new(
            binding("roughness"),
            ValueKind::Float,
            AttributeValue::Float(0.5),
            settings,
        ));
        let created = roughness.subscribe_attribute_created(|paths| {
            log::info!("Created {} roughness attribute(s)", paths.len());
        });
        listener.add_model(roughness.clone());
        panel.add_row(
            Rc::new(
                VirtualAttributeNameModel::new(SdfPath::new(format!("{}.roughness", MESHES[0])))
                    .with_display_name("Roughness"),
            ),
            vec![roughness as Rc<dyn ItemValueModel>],
        );

        let root_layer = handle.root_layer();
        let picker = FilePickerWidget::new(
            "Open USD file",
            false,
            move |path| {
                if path_utils::is_file_path_valid(path, &root_layer) {
                    None
                } else {
                    Some(format!("{} does not exist", path))
                }
            },
            |path| match path {
                Some(path) => log::info!("Selected {}", path),
                None => log::warn!("No valid file selected"),
            },
        )
        .with_config(&config)
        .with_placeholder("Path to a USD file");

        Ok(Self {
            stage,
            listener,
            panel,
            picker,
            _subscriptions: vec![created],
        })
    }

    fn undo(&self) {
        match self.stage.undo() {
            Ok(()) => self.listener.refresh_all(),
            Err(err) => log::debug!("Undo skipped: {}", err),
        }
    }
}

impl eframe::App for PropertiesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z)) {
            self.undo();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Mesh Properties");
            ui.label(format!("{} prims selected", MESHES.len()));
            ui.separator();
            self.panel.show(ui);
            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Reference:");
                self.picker.show(ui);
            });
        });
    }
}

impl Drop for PropertiesApp {
    fn drop(&mut self) {
        self.listener.destroy();
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    let config = PropertyConfig::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(constants::ui::DEFAULT_WINDOW_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        "USD Properties",
        options,
        Box::new(|_cc| Ok(Box::new(PropertiesApp::new(config)?))),
    )
}
