use crate::io::create_pcd_reader;
use eyre::{ensure, Result};
use kitti_format::point::FieldLayout;
use std::path::Path;

pub fn info(file: impl AsRef<Path>) -> Result<()> {
    let file = file.as_ref();

    ensure!(
        file.extension().map(|ext| ext == "pcd").unwrap_or(false),
        "file name must ends with '.pcd', but get '{}'",
        file.display()
    );

    let reader = create_pcd_reader(file)?;
    let meta = reader.meta();
    let fields = &meta.field_defs;

    println!("name\ttype\tcount");
    fields.iter().for_each(|field| {
        let pcd_rs::FieldDef {
            ref name,
            kind,
            count,
        } = *field;

        println!("{}\t{:?}\t{}", name, kind, count);
    });

    println!();
    println!("points\t{}", meta.num_points);

    match FieldLayout::from_names(fields.iter().map(|field| field.name.as_str())) {
        Ok(layout) => {
            let intensity = layout
                .intensity
                .and_then(|index| fields.iter().nth(index))
                .map_or("absent, written as 0.0", |field| field.name.as_str());
            println!("intensity\t{intensity}");
            println!("convertible\tyes");
        }
        Err(err) => println!("convertible\tno ({err})"),
    }

    Ok(())
}
