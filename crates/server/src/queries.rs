//! Fixed analytics statements over the inventory dataset.
//!
//! Tables: `productos`, `inventarios`, `almacenes`. The two views are
//! created by `POST /api/analytics/views`; `inventario_bajo_riesgo` depends
//! on `inventario_detalle`, so view order matters.

/// A named, fixed statement exposed by an endpoint or the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsQuery {
    /// Stable identifier used by the CLI.
    pub name: &'static str,
    /// Text returned as `metadata` next to the rows.
    pub description: &'static str,
    pub sql: &'static str,
}

pub const INVENTORY_DETAIL_VIEW: AnalyticsQuery = AnalyticsQuery {
    name: "view-inventory-detail",
    description: "Inventory joined with warehouse and product details",
    sql: "CREATE OR REPLACE VIEW inventario_detalle AS
SELECT
    t1.id_inventario, t1.stock_disponible, t1.stock_reservado, t1.ultima_actualizacion,
    t2.nombre AS nombre_almacen, t2.ubicacion,
    t3.nombre AS nombre_producto, t3.precio, t3.sku
FROM inventarios t1
INNER JOIN almacenes t2 ON t1.id_almacen = t2.id_almacen
INNER JOIN productos t3 ON t1.id_producto = t3.id_producto",
};

pub const LOW_STOCK_VIEW: AnalyticsQuery = AnalyticsQuery {
    name: "view-low-stock",
    description: "Inventory rows at risk of running out",
    sql: "CREATE OR REPLACE VIEW inventario_bajo_riesgo AS
SELECT
    nombre_producto, nombre_almacen, stock_disponible, stock_reservado, ultima_actualizacion
FROM inventario_detalle
WHERE stock_disponible < 150 OR stock_reservado > 100
ORDER BY stock_disponible ASC",
};

/// Views in creation order.
pub const VIEWS: [AnalyticsQuery; 2] = [INVENTORY_DETAIL_VIEW, LOW_STOCK_VIEW];

pub const TOP_PRODUCTS_BY_VALUE: AnalyticsQuery = AnalyticsQuery {
    name: "top-products-value",
    description: "Top 5 products by total inventory value",
    sql: "SELECT
    t2.nombre AS nombre_producto,
    SUM(CAST(t1.stock_disponible AS DOUBLE) * t2.precio) AS valor_inventario_total
FROM inventarios t1
INNER JOIN productos t2 ON t1.id_producto = t2.id_producto
GROUP BY t2.nombre
ORDER BY valor_inventario_total DESC
LIMIT 5",
};

pub const WAREHOUSE_EFFICIENCY: AnalyticsQuery = AnalyticsQuery {
    name: "warehouse-efficiency",
    description: "Distinct products and average stock per warehouse type",
    sql: "SELECT
    t2.tipo AS tipo_almacen,
    COUNT(DISTINCT t1.id_producto) AS productos_diferentes_almacenados,
    AVG(CAST(t1.stock_disponible AS DOUBLE)) AS stock_promedio_por_producto
FROM inventarios t1
INNER JOIN almacenes t2 ON t1.id_almacen = t2.id_almacen
GROUP BY t2.tipo
ORDER BY productos_diferentes_almacenados DESC",
};

pub const LOW_STOCK_INVENTORY: AnalyticsQuery = AnalyticsQuery {
    name: "low-stock-inventory",
    description: "Products at risk of stock-out (reads the inventario_bajo_riesgo view)",
    sql: "SELECT
    nombre_producto,
    nombre_almacen,
    stock_disponible,
    stock_reservado
FROM inventario_bajo_riesgo
LIMIT 20",
};

pub const PRODUCT_METRICS: AnalyticsQuery = AnalyticsQuery {
    name: "product-metrics",
    description: "Catalog-wide product count, average weight and volume, maximum price",
    sql: "SELECT
    COUNT(id_producto) AS total_productos,
    AVG(peso) AS peso_promedio_kg,
    AVG(volumen) AS volumen_promedio_m3,
    MAX(precio) AS precio_maximo
FROM productos",
};

pub const SIMPLE_STOCK_SAMPLE: AnalyticsQuery = AnalyticsQuery {
    name: "simple",
    description: "Sample of products with their warehouse and available stock",
    sql: "SELECT
    p.nombre AS producto,
    p.precio,
    a.nombre AS almacen,
    i.stock_disponible
FROM productos p
INNER JOIN inventarios i ON p.id_producto = i.id_producto
INNER JOIN almacenes a ON i.id_almacen = a.id_almacen
LIMIT 5",
};

/// Every named statement, views first.
pub static ALL: [AnalyticsQuery; 7] = [
    INVENTORY_DETAIL_VIEW,
    LOW_STOCK_VIEW,
    TOP_PRODUCTS_BY_VALUE,
    WAREHOUSE_EFFICIENCY,
    LOW_STOCK_INVENTORY,
    PRODUCT_METRICS,
    SIMPLE_STOCK_SAMPLE,
];

pub fn find(name: &str) -> Option<&'static AnalyticsQuery> {
    ALL.iter().find(|q| q.name == name)
}
